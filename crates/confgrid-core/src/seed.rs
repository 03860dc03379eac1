//! Reference configurations used to seed and restore a collection

use crate::error::ValidationError;
use crate::types::{ConfigKey, Matrix};

/// Configuration written by the seed and restore operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedConfiguration {
    /// Raw key
    pub key: &'static str,
    /// Payload rows
    pub matrix: [[&'static str; 3]; 3],
    /// Initial remark
    pub remark: &'static str,
}

impl SeedConfiguration {
    /// Validated key
    ///
    /// # Errors
    /// `ValidationError::BlankKey` if the fixture key is blank
    pub fn key(&self) -> Result<ConfigKey, ValidationError> {
        ConfigKey::parse(self.key)
    }

    /// Payload as a [`Matrix`]
    #[must_use]
    pub fn matrix(&self) -> Matrix {
        Matrix::from_rows(self.matrix)
    }
}

/// Remark written by restore
pub const RESTORE_REMARK: &str = "Original assignment configuration";

/// Seeded configurations; the first is the one restore targets
pub const SEED_CONFIGURATIONS: [SeedConfiguration; 3] = [
    SeedConfiguration {
        key: "qwertyuiop",
        matrix: [
            ["sym1", "sym2", "sym3"],
            ["sym4", "sym6", "sym8"],
            ["sym5", "sym1", "sym0"],
        ],
        remark: "Sample configuration for assignment testing",
    },
    SeedConfiguration {
        key: "test123",
        matrix: [["a1", "b2", "c3"], ["d4", "e5", "f6"], ["g7", "h8", "i9"]],
        remark: "Test configuration 1",
    },
    SeedConfiguration {
        key: "sample456",
        matrix: [["x1", "y2", "z3"], ["p4", "q5", "r6"], ["s7", "t8", "u9"]],
        remark: "Test configuration 2",
    },
];
