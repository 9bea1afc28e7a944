//! Upload handling
//!
//! Client-side validation and image uploads.

pub mod images;
pub mod validation;

pub use images::ImageUploader;
pub use validation::{ACCEPTED_IMAGE_TYPES, UploadValidator};
