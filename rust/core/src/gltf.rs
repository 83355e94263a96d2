// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary to the mesh decoder.
//!
//! The engine never interprets glTF itself. It hands the raw payload of a
//! b3dm tile to a [`GltfDecoder`]. [`GlbDecoder`] is a minimal decoder that
//! validates the GLB container and exposes the JSON and binary chunks;
//! renderers plug in a full glTF loader through the same trait.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use nalgebra::Vector3;
use serde_json::Value;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// Tileset-level switches forwarded to the mesh decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecodeOptions {
    /// Relative-to-centre offset from the tile's feature table.
    pub rtc_center: Option<Vector3<f64>>,
    /// Apply `rtc_center` as a model translation.
    pub correct_translation: bool,
    /// Replace glTF materials with a flat default material.
    pub use_fake_material: bool,
    /// Content is authored Y-up and must be flipped.
    pub flip_y: bool,
}

/// A decoded mesh, as far as the engine is concerned.
#[derive(Debug, Clone)]
pub struct GltfModel {
    pub json: Value,
    pub binary: Vec<u8>,
    pub mesh_count: usize,
    pub primitive_count: usize,
    /// Translation to apply on top of the tile transform.
    pub translation: Vector3<f64>,
    pub fake_material: bool,
}

/// Decodes a glTF payload into a model.
pub trait GltfDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], options: &DecodeOptions) -> Result<GltfModel>;
}

/// GLB container reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlbDecoder;

impl GltfDecoder for GlbDecoder {
    fn decode(&self, data: &[u8], options: &DecodeOptions) -> Result<GltfModel> {
        if data.len() < 12 {
            return Err(Error::GltfDecode("GLB header too small".into()));
        }
        if &data[0..4] != GLB_MAGIC {
            return Err(Error::GltfDecode("payload is not binary glTF".into()));
        }
        let version = LittleEndian::read_u32(&data[4..8]);
        if version != 2 {
            return Err(Error::GltfDecode(format!("unsupported glTF version {version}")));
        }
        let total = (LittleEndian::read_u32(&data[8..12]) as usize).min(data.len());

        let mut offset = 12usize;
        let mut json: Option<Value> = None;
        let mut binary: Vec<u8> = Vec::new();

        while offset + 8 <= total {
            let chunk_len = LittleEndian::read_u32(&data[offset..offset + 4]) as usize;
            let chunk_type = LittleEndian::read_u32(&data[offset + 4..offset + 8]);
            offset += 8;
            let body = data.get(offset..offset + chunk_len).ok_or_else(|| {
                Error::GltfDecode(format!("chunk at {} overruns payload", offset - 8))
            })?;
            match chunk_type {
                CHUNK_JSON => {
                    json = Some(
                        serde_json::from_slice(body)
                            .map_err(|e| Error::GltfDecode(format!("invalid JSON chunk: {e}")))?,
                    );
                }
                CHUNK_BIN => binary = body.to_vec(),
                _ => {}
            }
            offset += chunk_len;
        }

        let json = json.ok_or_else(|| Error::GltfDecode("no JSON chunk".into()))?;
        let meshes = json.get("meshes").and_then(Value::as_array);
        let mesh_count = meshes.map_or(0, Vec::len);
        let primitive_count = meshes.map_or(0, |m| {
            m.iter()
                .filter_map(|mesh| mesh.get("primitives").and_then(Value::as_array))
                .map(Vec::len)
                .sum()
        });

        let translation = match (options.correct_translation, options.rtc_center) {
            (true, Some(rtc)) => rtc,
            _ => Vector3::zeros(),
        };

        Ok(GltfModel {
            json,
            binary,
            mesh_count,
            primitive_count,
            translation,
            fake_material: options.use_fake_material,
        })
    }
}

/// Assemble a GLB container from a JSON document and a binary buffer.
pub fn encode_glb(json: &Value, binary: &[u8]) -> Vec<u8> {
    let mut json_bytes = json.to_string().into_bytes();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    let mut bin = binary.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let bin_chunk = if bin.is_empty() { 0 } else { 8 + bin.len() };
    let total = 12 + 8 + json_bytes.len() + bin_chunk;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "asset": {"version": "2.0"},
            "meshes": [
                {"primitives": [{"attributes": {"POSITION": 0}}, {"attributes": {"POSITION": 1}}]},
                {"primitives": [{"attributes": {"POSITION": 2}}]}
            ]
        })
    }

    #[test]
    fn test_decode_glb() {
        let glb = encode_glb(&sample(), &[1, 2, 3]);
        assert_eq!(glb.len() % 4, 0);
        let model = GlbDecoder.decode(&glb, &DecodeOptions::default()).unwrap();
        assert_eq!(model.mesh_count, 2);
        assert_eq!(model.primitive_count, 3);
        assert_eq!(&model.binary[..3], &[1, 2, 3]);
        assert_eq!(model.translation, Vector3::zeros());
    }

    #[test]
    fn test_translation_correction() {
        let glb = encode_glb(&sample(), &[]);
        let options = DecodeOptions {
            rtc_center: Some(Vector3::new(1.0, 2.0, 3.0)),
            correct_translation: true,
            use_fake_material: true,
            flip_y: false,
        };
        let model = GlbDecoder.decode(&glb, &options).unwrap();
        assert_eq!(model.translation, Vector3::new(1.0, 2.0, 3.0));
        assert!(model.fake_material);
        assert!(model.binary.is_empty());
    }

    #[test]
    fn test_reject_non_glb() {
        assert!(GlbDecoder.decode(b"short", &DecodeOptions::default()).is_err());
        assert!(GlbDecoder
            .decode(b"{\"asset\":{\"version\":\"2.0\"}}", &DecodeOptions::default())
            .is_err());

        let mut glb = encode_glb(&sample(), &[]);
        glb[4] = 1;
        assert!(matches!(
            GlbDecoder.decode(&glb, &DecodeOptions::default()),
            Err(Error::GltfDecode(_))
        ));
    }
}
