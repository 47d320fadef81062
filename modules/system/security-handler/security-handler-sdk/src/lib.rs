//! Security Handler SDK
//!
//! This crate provides the contract between the security handler and AAMs:
//!
//! - [`AamClient`] - Remote AAM operations (tokens, certificates, validation)
//! - [`CredentialCertificates`] - Certificates sent alongside a token for validation
//! - [`CertificateRequest`] - Account-authenticated request for a client certificate
//! - [`AamClientError`] - Error types

pub mod api;
pub mod error;
pub mod models;

// Re-export main types at crate root
pub use api::AamClient;
pub use error::AamClientError;
pub use models::{CertificateRequest, CredentialCertificates};
