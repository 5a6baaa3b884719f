//! Shared types for crowdcount: configuration, the common error type,
//! service credentials and structured trace events.

pub mod config;
pub mod error;
pub mod service;
pub mod trace;

pub use error::{Error, Result};
pub use service::{CredentialSource, Credentials, Service};
