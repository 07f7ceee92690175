//! Credential-domain models: redacted secrets and cached authorization records.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
