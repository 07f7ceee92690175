//! Shared HTTP plumbing for identity-service and upstream calls.
//!
//! Both the token exchange and the proxied traffic go through one [`ReqwestClient`] built by
//! [`build_client`]. Redirects are never followed: token endpoints answer directly, and a 3xx
//! from the content service belongs to the browser, not to the proxy.

// crates.io
use axum::http::{
	HeaderMap, HeaderName,
	header::{
		CONNECTION, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING,
		UPGRADE,
	},
};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

const KEEP_ALIVE: &str = "keep-alive";

/// Builds the client shared by the credential provider and the proxy executor.
pub fn build_client() -> Result<ReqwestClient, ConfigError> {
	Ok(ReqwestClient::builder().redirect(Policy::none()).build()?)
}

/// Returns `true` for headers that describe a single connection and must not be forwarded.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
	[CONNECTION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE]
		.contains(name)
		|| name.as_str() == KEEP_ALIVE
}

/// Copies the end-to-end headers from `headers`.
///
/// Hop-by-hop headers, anything the `Connection` header nominates, and `Host` are dropped; the
/// client stack recomputes them for the next hop.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
	let nominated = headers
		.get_all(CONNECTION)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(','))
		.map(|name| name.trim().to_ascii_lowercase())
		.filter(|name| !name.is_empty())
		.collect::<Vec<_>>();
	let mut forwarded = HeaderMap::with_capacity(headers.len());

	for (name, value) in headers {
		if *name == HOST || is_hop_by_hop(name) || nominated.iter().any(|n| n == name.as_str()) {
			continue;
		}

		forwarded.append(name.clone(), value.clone());
	}

	forwarded
}
