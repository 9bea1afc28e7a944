//! Logging middleware
//!
//! Request logging for the service entry points.

use log::{info, warn};

use crate::auth::Principal;
use crate::error::FileServiceError;

/// Log an incoming operation against a project or user scope
pub fn log_request(principal: &Principal, operation: &str, scope: &str) {
    info!("{} requested {operation} on {scope}", principal.key());
}

/// Log a rejected operation
pub fn log_rejection(principal: &Principal, operation: &str, err: &FileServiceError) {
    warn!("{} denied {operation}: {err}", principal.key());
}
