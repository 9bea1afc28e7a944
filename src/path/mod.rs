//! Virtual path utility
//!
//! Normalizes, validates, and joins slash-delimited virtual paths.

pub mod operations;

pub use operations::{
    ROOT, folder_full_path, is_valid_path, join, normalize, parent, validate, validate_name,
};
