//! Conversion between 3MF transform strings and 4x4 matrices
//!
//! 3MF stores affine transforms as 12 floats in row-vector layout:
//!
//! ```text
//! "m00 m01 m02 m10 m11 m12 m20 m21 m22 tx ty tz"
//!
//! [x' y' z' 1] = [x y z 1] * | m00 m01 m02 0 |
//!                            | m10 m11 m12 0 |
//!                            | m20 m21 m22 0 |
//!                            | tx  ty  tz  1 |
//! ```
//!
//! [`Matrix4`] uses column-vector convention (`v' = M * v`), so decoding
//! places the input's rows as columns. Package values are millimeters; the
//! host scene may use another unit, so a scale factor is applied to the
//! translation triple only — the 3x3 linear block is dimensionless.

/// Scale factor from package millimeters to meters
pub const MM_TO_M: f64 = 0.001;

/// Scale factor from meters to package millimeters
pub const M_TO_MM: f64 = 1000.0;

/// The identity transform in 3MF string form
pub const IDENTITY_TRANSFORM: &str = "1 0 0 0 1 0 0 0 1 0 0 0";

/// Number of values in a 3MF transform string (4x3 affine matrix)
const TRANSFORM_MATRIX_SIZE: usize = 12;

/// A 4x4 affine matrix in column-vector convention (`v' = M * v`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4 {
    rows: [[f64; 4]; 4],
}

impl Matrix4 {
    /// The identity matrix
    pub const IDENTITY: Matrix4 = Matrix4 {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Build a matrix from four rows
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Matrix4 { rows }
    }

    /// The four rows of the matrix
    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.rows
    }

    /// Element at (row, col)
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    /// The translation column (x, y, z)
    pub fn translation(&self) -> [f64; 3] {
        [self.rows[0][3], self.rows[1][3], self.rows[2][3]]
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Matrix4::IDENTITY
    }
}

/// Decode a 3MF transform string into a [`Matrix4`]
///
/// Only the translation components are multiplied by `scale`. Empty,
/// missing, or malformed input (anything other than 12 numeric tokens)
/// decodes to the identity matrix — legacy and hand-edited files carry
/// such values and must not fail the parse.
pub fn decode(transform: &str, scale: f64) -> Matrix4 {
    let values: Vec<f64> = match transform
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<std::result::Result<Vec<f64>, _>>()
    {
        Ok(values) => values,
        Err(_) => return Matrix4::IDENTITY,
    };

    if values.len() != TRANSFORM_MATRIX_SIZE {
        return Matrix4::IDENTITY;
    }

    // Transpose from row-vector to column-vector layout
    Matrix4::from_rows([
        [values[0], values[3], values[6], values[9] * scale],
        [values[1], values[4], values[7], values[10] * scale],
        [values[2], values[5], values[8], values[11] * scale],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Encode a [`Matrix4`] as a 3MF transform string
///
/// Transposes from column-vector back to row-vector layout and multiplies
/// the translation by `scale`. Components are formatted with Rust's
/// shortest round-trip `f64` representation, so a decode → encode → decode
/// cycle reproduces the matrix exactly.
pub fn encode(matrix: &Matrix4, scale: f64) -> String {
    let m = matrix.rows();
    let values = [
        m[0][0],
        m[1][0],
        m[2][0],
        m[0][1],
        m[1][1],
        m[2][1],
        m[0][2],
        m[1][2],
        m[2][2],
        m[0][3] * scale,
        m[1][3] * scale,
        m[2][3] * scale,
    ];

    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_identity_string() {
        assert_eq!(decode(IDENTITY_TRANSFORM, 1.0), Matrix4::IDENTITY);
    }

    #[test]
    fn test_decode_empty_is_identity() {
        assert_eq!(decode("", 0.001), Matrix4::IDENTITY);
        assert_eq!(decode("   ", 0.001), Matrix4::IDENTITY);
    }

    #[test]
    fn test_decode_wrong_token_count_is_identity() {
        // 11 tokens
        assert_eq!(
            decode("1 0 0 0 1 0 0 0 1 0 0", 1.0),
            Matrix4::IDENTITY
        );
        // 13 tokens
        assert_eq!(
            decode("1 0 0 0 1 0 0 0 1 0 0 0 5", 1.0),
            Matrix4::IDENTITY
        );
    }

    #[test]
    fn test_decode_non_numeric_is_identity() {
        assert_eq!(
            decode("1 0 0 0 1 0 0 0 1 x y z", 1.0),
            Matrix4::IDENTITY
        );
    }

    #[test]
    fn test_decode_scales_translation_only() {
        let m = decode("2 0 0 0 3 0 0 0 4 10 20 30", 0.001);
        // Linear block is dimensionless
        assert_eq!(m.at(0, 0), 2.0);
        assert_eq!(m.at(1, 1), 3.0);
        assert_eq!(m.at(2, 2), 4.0);
        // Translation is scaled mm -> m
        assert_eq!(m.translation(), [0.01, 0.02, 0.03]);
    }

    #[test]
    fn test_decode_transposes_rows_to_columns() {
        // A pure rotation-ish matrix with distinct entries: rows of the
        // string become columns of the matrix.
        let m = decode("1 2 3 4 5 6 7 8 9 0 0 0", 1.0);
        assert_eq!(m.at(0, 0), 1.0);
        assert_eq!(m.at(1, 0), 2.0);
        assert_eq!(m.at(2, 0), 3.0);
        assert_eq!(m.at(0, 1), 4.0);
        assert_eq!(m.at(0, 2), 7.0);
    }

    #[test]
    fn test_encode_decode_exact_roundtrip() {
        let original = "0.5 0 0 0 0.25 0 0 0 1 12.75 -3.5 0.1";
        let matrix = decode(original, 1.0);
        let encoded = encode(&matrix, 1.0);
        assert_eq!(decode(&encoded, 1.0), matrix);
    }

    #[test]
    fn test_encode_inverse_scale() {
        let m = Matrix4::from_rows([
            [1.0, 0.0, 0.0, 0.004],
            [0.0, 1.0, 0.0, -0.125],
            [0.0, 0.0, 1.0, 2.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let s = encode(&m, M_TO_MM);
        let back = decode(&s, MM_TO_M);
        for row in 0..4 {
            for col in 0..4 {
                let (a, b) = (m.at(row, col), back.at(row, col));
                assert!(
                    (a - b).abs() <= 1e-12 * a.abs().max(1.0),
                    "mismatch at ({row}, {col}): {a} vs {b}"
                );
            }
        }
    }
}
