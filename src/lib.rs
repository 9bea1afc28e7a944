//! Cliquest file service
//!
//! A virtual hierarchical file system for project files, layered on a flat
//! document store and a blob store.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod files;
pub mod folders;
pub mod middleware;
pub mod model;
pub mod path;
pub mod service;
pub mod storage;
pub mod store;
pub mod upload;

pub use error::{FileServiceError, Result};
pub use service::FileService;
