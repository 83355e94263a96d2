// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batched 3D Model (b3dm) payload decoder.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! +---------------------+  0
//! | header (28 bytes)   |
//! +---------------------+  28
//! | feature table JSON  |
//! | feature table bin   |
//! | batch table JSON    |
//! | batch table bin     |
//! +---------------------+
//! | glTF (GLB) payload  |
//! +---------------------+  byteLength
//! ```
//!
//! The decoder reads from any [`Read`] and never seeks. The glTF payload is
//! kept as raw bytes and handed to a [`GltfDecoder`] the first time a model
//! is requested.

use crate::error::{Error, Result};
use crate::gltf::{DecodeOptions, GltfDecoder, GltfModel};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use nalgebra::Vector3;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::io::{self, Read, Write};

pub const B3DM_MAGIC: &[u8; 4] = b"b3dm";
pub const HEADER_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct B3dmHeader {
    pub version: u32,
    pub byte_length: u32,
    pub feature_table_json_len: u32,
    pub feature_table_binary_len: u32,
    pub batch_table_json_len: u32,
    pub batch_table_binary_len: u32,
}

impl B3dmHeader {
    /// Decode the fixed header. The magic is checked before any other field
    /// is interpreted.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        if &bytes[0..4] != B3DM_MAGIC {
            return Err(Error::format(format!(
                "not a b3dm payload (magic {:?})",
                String::from_utf8_lossy(&bytes[0..4])
            )));
        }
        let word = |i: usize| LittleEndian::read_u32(&bytes[4 * i..4 * i + 4]);
        Ok(Self {
            version: word(1),
            byte_length: word(2),
            feature_table_json_len: word(3),
            feature_table_binary_len: word(4),
            batch_table_json_len: word(5),
            batch_table_binary_len: word(6),
        })
    }

    /// Bytes left for the glTF payload once the header and the four table
    /// sections are accounted for.
    pub fn mesh_len(&self) -> Result<usize> {
        let tables = HEADER_LEN as u64
            + self.feature_table_json_len as u64
            + self.feature_table_binary_len as u64
            + self.batch_table_json_len as u64
            + self.batch_table_binary_len as u64;
        (self.byte_length as u64)
            .checked_sub(tables)
            .map(|n| n as usize)
            .ok_or_else(|| {
                Error::format(format!(
                    "byteLength {} is smaller than header and tables ({tables})",
                    self.byte_length
                ))
            })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(B3DM_MAGIC)?;
        for v in [
            self.version,
            self.byte_length,
            self.feature_table_json_len,
            self.feature_table_binary_len,
            self.batch_table_json_len,
            self.batch_table_binary_len,
        ] {
            w.write_u32::<LittleEndian>(v)?;
        }
        Ok(())
    }
}

/// Feature table of a b3dm tile.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub batch_length: u32,
    pub rtc_center: Option<Vector3<f64>>,
    pub json: Map<String, Value>,
}

/// Resolve a `{ "byteOffset": n }` reference against the binary body.
fn binary_slice<'a>(
    binary: &'a [u8],
    reference: &Map<String, Value>,
    property: &str,
    len: usize,
) -> Result<&'a [u8]> {
    if binary.is_empty() {
        return Err(Error::format(format!(
            "{property} references an empty binary body"
        )));
    }
    let offset = reference
        .get("byteOffset")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::format(format!("{property} reference has no byteOffset")))?
        as usize;
    offset
        .checked_add(len)
        .and_then(|end| binary.get(offset..end))
        .ok_or_else(|| {
            Error::format(format!(
                "{property} at byteOffset {offset} overruns binary body of {} bytes",
                binary.len()
            ))
        })
}

impl FeatureTable {
    pub fn parse(json: Map<String, Value>, binary: &[u8]) -> Result<Self> {
        let rtc_center = match json.get("RTC_CENTER") {
            None => None,
            Some(Value::Array(values)) => {
                let nums: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
                if nums.len() != 3 || values.len() != 3 {
                    return Err(Error::format("RTC_CENTER must hold 3 numbers"));
                }
                Some(Vector3::new(nums[0], nums[1], nums[2]))
            }
            Some(Value::Object(reference)) => {
                let bytes = binary_slice(binary, reference, "RTC_CENTER", 12)?;
                Some(Vector3::new(
                    LittleEndian::read_f32(&bytes[0..4]) as f64,
                    LittleEndian::read_f32(&bytes[4..8]) as f64,
                    LittleEndian::read_f32(&bytes[8..12]) as f64,
                ))
            }
            Some(other) => {
                return Err(Error::format(format!("unexpected RTC_CENTER value {other}")));
            }
        };

        let batch_length = match json.get("BATCH_LENGTH") {
            None => 0,
            Some(Value::Object(reference)) => {
                let bytes = binary_slice(binary, reference, "BATCH_LENGTH", 4)?;
                LittleEndian::read_u32(bytes)
            }
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| Error::format(format!("invalid BATCH_LENGTH {v}")))?,
        };

        Ok(Self {
            batch_length,
            rtc_center,
            json,
        })
    }
}

/// Batch table placeholder: the JSON is kept, per-feature properties are not
/// decoded.
#[derive(Debug, Clone, Default)]
pub struct BatchTable {
    pub json: Map<String, Value>,
    pub binary_len: usize,
}

/// A decoded b3dm tile.
#[derive(Debug)]
pub struct B3dmPayload {
    pub url: String,
    pub header: B3dmHeader,
    pub feature_table: FeatureTable,
    pub batch_table: Option<BatchTable>,
    mesh: Vec<u8>,
    model: OnceCell<Option<GltfModel>>,
}

/// Read exactly `len` bytes or fail with [`Error::TruncatedRead`].
/// Upper bound on up-front allocation for one section; larger sections grow
/// as bytes arrive.
const MAX_PREALLOC: usize = 1 << 20;

fn read_section<R: Read>(r: &mut R, len: usize, section: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
    r.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(Error::TruncatedRead {
            section,
            expected: len,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

fn skip_section<R: Read>(r: &mut R, len: usize, section: &'static str) -> Result<()> {
    let copied = io::copy(&mut r.by_ref().take(len as u64), &mut io::sink())? as usize;
    if copied != len {
        return Err(Error::TruncatedRead {
            section,
            expected: len,
            actual: copied,
        });
    }
    Ok(())
}

/// JSON sections are padded with spaces (and by some writers with NULs).
fn parse_json_object(bytes: &[u8], section: &str) -> Result<Map<String, Value>> {
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\0' | b'\n' | b'\r' | b'\t'))
        .map_or(0, |i| i + 1);
    match serde_json::from_slice::<Value>(&bytes[..end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::format(format!("{section} JSON is not an object"))),
        Err(e) => Err(Error::format(format!("{section} JSON is invalid: {e}"))),
    }
}

impl B3dmPayload {
    /// Decode a b3dm tile from a stream. `url` is only used in diagnostics.
    pub fn read<R: Read>(mut reader: R, url: &str) -> Result<Self> {
        let mut raw = [0u8; HEADER_LEN];
        let got = read_section(&mut reader, HEADER_LEN, "header")?;
        raw.copy_from_slice(&got);
        let header = B3dmHeader::parse(&raw)?;
        if header.version != 1 {
            tracing::warn!(url, version = header.version, "Unexpected b3dm version");
        }
        let mesh_len = header.mesh_len()?;

        let ft_json_len = header.feature_table_json_len as usize;
        let ft_bin_len = header.feature_table_binary_len as usize;
        let bt_json_len = header.batch_table_json_len as usize;
        let bt_bin_len = header.batch_table_binary_len as usize;

        let feature_table = if ft_json_len > 0 {
            let json = read_section(&mut reader, ft_json_len, "feature table JSON")?;
            let json = parse_json_object(&json, "feature table")?;
            let binary = read_section(&mut reader, ft_bin_len, "feature table binary")?;
            FeatureTable::parse(json, &binary)?
        } else {
            skip_section(&mut reader, ft_bin_len, "feature table binary")?;
            FeatureTable::default()
        };

        let batch_table = if bt_json_len > 0 && feature_table.batch_length > 0 {
            let json = read_section(&mut reader, bt_json_len, "batch table JSON")?;
            let json = parse_json_object(&json, "batch table")?;
            skip_section(&mut reader, bt_bin_len, "batch table binary")?;
            Some(BatchTable {
                json,
                binary_len: bt_bin_len,
            })
        } else {
            skip_section(&mut reader, bt_json_len + bt_bin_len, "batch table")?;
            None
        };

        let mesh = read_section(&mut reader, mesh_len, "glTF payload")?;

        tracing::debug!(
            url,
            batch_length = feature_table.batch_length,
            mesh_bytes = mesh.len(),
            "Decoded b3dm"
        );

        Ok(Self {
            url: url.to_string(),
            header,
            feature_table,
            batch_table,
            mesh,
            model: OnceCell::new(),
        })
    }

    /// Raw glTF bytes.
    pub fn mesh_bytes(&self) -> &[u8] {
        &self.mesh
    }

    /// Decoded mesh model, produced on first call. A decode failure is
    /// logged and remembered, later calls return `None` without retrying.
    pub fn model(&self, decoder: &dyn GltfDecoder, options: &DecodeOptions) -> Option<&GltfModel> {
        self.model
            .get_or_init(|| {
                let options = DecodeOptions {
                    rtc_center: self.feature_table.rtc_center,
                    ..*options
                };
                match decoder.decode(&self.mesh, &options) {
                    Ok(model) => Some(model),
                    Err(e) => {
                        tracing::warn!(url = %self.url, error = %e, "Failed to decode tile mesh");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Whether the model has been decoded (successfully or not).
    pub fn model_attempted(&self) -> bool {
        self.model.get().is_some()
    }
}

/// Write a b3dm tile. `byteLength` is computed from the section sizes.
pub fn write_b3dm<W: Write>(
    w: &mut W,
    feature_table_json: &[u8],
    feature_table_binary: &[u8],
    batch_table_json: &[u8],
    batch_table_binary: &[u8],
    mesh: &[u8],
) -> io::Result<()> {
    let total = HEADER_LEN
        + feature_table_json.len()
        + feature_table_binary.len()
        + batch_table_json.len()
        + batch_table_binary.len()
        + mesh.len();
    let len = |n: usize| {
        u32::try_from(n).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "b3dm section too large"))
    };
    let header = B3dmHeader {
        version: 1,
        byte_length: len(total)?,
        feature_table_json_len: len(feature_table_json.len())?,
        feature_table_binary_len: len(feature_table_binary.len())?,
        batch_table_json_len: len(batch_table_json.len())?,
        batch_table_binary_len: len(batch_table_binary.len())?,
    };
    header.write_to(w)?;
    for section in [
        feature_table_json,
        feature_table_binary,
        batch_table_json,
        batch_table_binary,
        mesh,
    ] {
        w.write_all(section)?;
    }
    Ok(())
}
