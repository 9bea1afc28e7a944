//! Data model
//!
//! Record types shared by the folder directory and file registry.

pub mod records;

pub use records::{
    Creator, FileDescriptor, FileRecord, FolderRecord, Provenance, UploadFile, fields, file_id,
    folder_id,
};
