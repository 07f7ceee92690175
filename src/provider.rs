//! Credential providers that mint fresh authorization values.
//!
//! A provider only talks to the outside world; it never touches the cached state. The
//! [`CredentialStore`](crate::store::CredentialStore) decides when to call it and anchors the
//! returned relative lifetime at its own clock.

pub mod client_credentials;

pub use client_credentials::*;

// self
use crate::{_prelude::*, auth::IssuedCredential, error::TokenError};

/// Boxed future returned by [`CredentialProvider::fetch_credential`].
pub type ProviderFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IssuedCredential, TokenError>> + 'a + Send>>;

/// Source of expiring authorization values.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Obtains a new credential together with its lifetime.
	fn fetch_credential(&self) -> ProviderFuture<'_>;
}
