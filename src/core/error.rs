//! Error types for batched spatial queries

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid traversal capacity {capacity}, expected one of 32/64/128/256/512/1024")]
    InvalidCapacity { capacity: usize },

    #[error("batched input shape mismatch: {what} has length {got}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("tetra topology has {got} entries for {expected} tetrahedra")]
    Topology { got: usize, expected: usize },
}
