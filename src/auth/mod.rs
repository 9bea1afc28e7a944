//! Authorization
//!
//! Principals, the documents they act on, and the access policy per
//! collection and operation.

pub mod policy;
pub mod principal;

pub use policy::{AccessPolicy, AccessRequest};
pub use principal::{ChatDoc, MessageDoc, MessageScope, Principal, ProjectAccess};
