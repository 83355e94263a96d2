// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire layout of tile transforms.
//!
//! A tile `transform` is 16 numbers in four groups of four; each group is one
//! column of the 4x4 matrix, so the translation sits at indices 12, 13, 14.

use crate::error::{Error, Result};
use nalgebra::Matrix4;

pub fn matrix_from_wire(values: &[f64]) -> Result<Matrix4<f64>> {
    if values.len() != 16 {
        return Err(Error::InvalidTransform(values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFinite("transform"));
    }
    Ok(Matrix4::from_column_slice(values))
}

pub fn matrix_to_wire(m: &Matrix4<f64>) -> [f64; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_at_indices_12_to_14() {
        let mut wire = [0.0; 16];
        wire[0] = 1.0;
        wire[5] = 1.0;
        wire[10] = 1.0;
        wire[15] = 1.0;
        wire[12] = 1215107.0;
        wire[13] = -4736648.0;
        wire[14] = 4081966.0;
        let m = matrix_from_wire(&wire).unwrap();
        assert_eq!(m[(0, 3)], 1215107.0);
        assert_eq!(m[(1, 3)], -4736648.0);
        assert_eq!(m[(2, 3)], 4081966.0);
        assert_eq!(matrix_to_wire(&m), wire);
    }

    #[test]
    fn test_wrong_arity() {
        assert!(matches!(
            matrix_from_wire(&[1.0; 12]),
            Err(Error::InvalidTransform(12))
        ));
        let mut wire = [0.0; 16];
        wire[3] = f64::NAN;
        assert!(matrix_from_wire(&wire).is_err());
    }

    #[test]
    fn test_translation_written_to_indices_12_to_14() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = 1.0;
        m[(1, 3)] = 2.0;
        m[(2, 3)] = 3.0;
        assert_eq!(matrix_to_wire(&m)[12..15], [1.0, 2.0, 3.0]);
    }
}
