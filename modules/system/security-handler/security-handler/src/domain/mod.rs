//! Domain layer for the security handler.

pub mod component;
pub mod error;
mod local_validation;
pub mod service;
pub mod wallet;

pub use component::ComponentSecurityHandler;
pub use error::SecurityHandlerError;
pub use service::SecurityHandler;
pub use wallet::{BoundCredentials, CredentialsWallet};
