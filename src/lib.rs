//! Authenticating reverse proxy for a headless content service.
//!
//! Requests under `/content/` are forwarded to the configured content service with a static or
//! OAuth 2.0 client-credentials `Authorization` value attached. Tokens are cached and refreshed
//! single-flight, and bodies stream through in both directions without buffering.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod provider;
pub mod proxy;
pub mod server;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use reqwest::redirect::Policy;
	// self
	use crate::{
		auth::{IssuedCredential, Secret},
		error::TokenError,
		provider::{CredentialProvider, ProviderFuture},
	};

	/// Credential provider that hands out `Bearer token-N` values and counts every fetch.
	///
	/// An optional delay keeps each fetch in flight long enough for concurrent callers to pile
	/// up behind it.
	#[derive(Debug)]
	pub struct CountingProvider {
		calls: AtomicUsize,
		expires_in: Duration,
		delay: Option<std::time::Duration>,
		fail: bool,
	}
	impl CountingProvider {
		/// Creates a provider issuing credentials valid for `expires_in`.
		pub fn new(expires_in: Duration) -> Self {
			Self { calls: AtomicUsize::new(0), expires_in, delay: None, fail: false }
		}

		/// Holds every fetch open for `delay` before answering.
		pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
			self.delay = Some(delay);

			self
		}

		/// Makes every fetch fail with a token endpoint error.
		pub fn failing(mut self) -> Self {
			self.fail = true;

			self
		}

		/// Number of fetches started so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl CredentialProvider for CountingProvider {
		fn fetch_credential(&self) -> ProviderFuture<'_> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

				if let Some(delay) = self.delay {
					tokio::time::sleep(delay).await;
				}
				if self.fail {
					return Err(TokenError::Endpoint {
						message: format!("fetch {call} refused"),
						status: Some(503),
					});
				}

				Ok(IssuedCredential {
					value: Secret::new(format!("Bearer token-{call}")),
					expires_in: self.expires_in,
				})
			})
		}
	}

	/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`.
	///
	/// Redirects stay disabled, matching [`build_client`](crate::http::build_client).
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.redirect(Policy::none())
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Fixed instant used as `T = 0` by time-window tests.
	pub fn epoch() -> OffsetDateTime {
		time::macros::datetime!(2025-01-01 00:00 UTC)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		net::SocketAddr,
		path::{Path, PathBuf},
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
// The binary reports startup failures through `color-eyre`.
use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
