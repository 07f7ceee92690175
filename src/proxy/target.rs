//! Upstream URL construction and transport selection.

// self
use crate::{_prelude::*, error::UpstreamError};

/// Fixed path prefix routed to the content service.
pub const PROXY_PREFIX: &str = "/content/";

/// Builds the upstream URL for an inbound path-and-query.
///
/// Returns `None` when the path is outside [`PROXY_PREFIX`]. Trailing slashes on `server_url`
/// collapse so exactly one separator precedes `content`; the remainder and the query string are
/// appended verbatim.
pub fn upstream_url(server_url: &str, path_and_query: &str) -> Option<String> {
	let rest = path_and_query.strip_prefix(PROXY_PREFIX)?;

	Some(format!("{}{PROXY_PREFIX}{rest}", server_url.trim_end_matches('/')))
}

/// Path every upstream target must stay under: the server path followed by [`PROXY_PREFIX`].
pub fn content_root(server_url: &Url) -> String {
	format!("{}{PROXY_PREFIX}", server_url.path().trim_end_matches('/'))
}

/// Outbound transport matching the upstream URL scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
	/// Cleartext HTTP.
	Plain,
	/// HTTP over TLS.
	Secure,
}
impl Transport {
	/// Selects the transport for `url`.
	pub fn for_url(url: &Url) -> Result<Self, UpstreamError> {
		match url.scheme() {
			"https" => Ok(Self::Secure),
			"http" => Ok(Self::Plain),
			scheme => Err(UpstreamError::UnsupportedScheme { scheme: scheme.to_owned() }),
		}
	}

	/// Returns a stable label for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Plain => "http",
			Self::Secure => "https",
		}
	}
}

/// Parsed upstream destination for one proxied request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamTarget {
	/// Absolute upstream URL.
	pub url: Url,
	/// Transport chosen from the URL scheme.
	pub transport: Transport,
}
impl UpstreamTarget {
	/// Parses `raw`, selects its transport, and checks it stays under `content_root`.
	///
	/// URL parsing resolves dot segments (including percent-encoded ones), so the check runs on
	/// the parsed path.
	pub fn parse(raw: &str, content_root: &str) -> Result<Self, UpstreamError> {
		let url = Url::parse(raw)
			.map_err(|source| UpstreamError::InvalidUrl { url: raw.to_owned(), source })?;
		let transport = Transport::for_url(&url)?;

		if !url.path().starts_with(content_root) {
			return Err(UpstreamError::OutsideProxyPrefix { path: url.path().to_owned() });
		}

		Ok(Self { url, transport })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const ITEM_PATH: &str = "/content/published/api/v1.1/items/123";

	#[test]
	fn exactly_one_separator_before_content() {
		for server in ["https://example.com/oce", "https://example.com/oce/", "https://example.com/oce//"]
		{
			assert_eq!(
				upstream_url(server, ITEM_PATH).as_deref(),
				Some("https://example.com/oce/content/published/api/v1.1/items/123")
			);
		}

		assert_eq!(
			upstream_url("https://example.com", ITEM_PATH).as_deref(),
			Some("https://example.com/content/published/api/v1.1/items/123")
		);
	}

	#[test]
	fn query_string_is_kept_verbatim() {
		assert_eq!(
			upstream_url(
				"http://localhost:8000",
				"/content/published/api/v1.1/items?q=(type eq \"Blog\")&limit=5"
			)
			.as_deref(),
			Some(
				"http://localhost:8000/content/published/api/v1.1/items?q=(type eq \"Blog\")&limit=5"
			)
		);
	}

	#[test]
	fn paths_outside_the_prefix_are_not_proxied() {
		assert_eq!(upstream_url("https://example.com", "/index.html"), None);
		assert_eq!(upstream_url("https://example.com", "/contents/x"), None);
		assert_eq!(upstream_url("https://example.com", "/content"), None);
	}

	#[test]
	fn transport_follows_scheme() {
		let secure = UpstreamTarget::parse("https://example.com/content/x", "/content/")
			.expect("HTTPS targets should parse.");
		let plain = UpstreamTarget::parse("http://example.com/content/x", "/content/")
			.expect("HTTP targets should parse.");

		assert_eq!(secure.transport, Transport::Secure);
		assert_eq!(plain.transport, Transport::Plain);
		assert!(matches!(
			UpstreamTarget::parse("ws://example.com/content/x", "/content/"),
			Err(UpstreamError::UnsupportedScheme { .. })
		));
		assert!(matches!(
			UpstreamTarget::parse("::nonsense", "/content/"),
			Err(UpstreamError::InvalidUrl { .. })
		));
	}

	#[test]
	fn content_root_follows_server_path() {
		let server = |raw: &str| Url::parse(raw).expect("Server URL fixture should parse.");

		assert_eq!(content_root(&server("https://example.com")), "/content/");
		assert_eq!(content_root(&server("https://example.com/oce")), "/oce/content/");
		assert_eq!(content_root(&server("https://example.com/oce/")), "/oce/content/");
	}

	#[test]
	fn dot_segments_cannot_leave_the_content_root() {
		let server = Url::parse("https://example.com/oce").expect("Server URL fixture should parse.");
		let root = content_root(&server);

		for path in [
			"/content/../admin/secrets",
			"/content/%2e%2e/admin/secrets",
			"/content/%2E%2e/admin/secrets",
			"/content/.%2e/admin/secrets",
			"/content/published/../../admin/secrets",
		] {
			let raw = upstream_url("https://example.com/oce", path)
				.expect("Paths under the prefix always produce a URL.");

			assert!(
				matches!(
					UpstreamTarget::parse(&raw, &root),
					Err(UpstreamError::OutsideProxyPrefix { .. })
				),
				"{path} must be rejected"
			);
		}

		let inner = upstream_url("https://example.com/oce", "/content/published/../items/1")
			.expect("Paths under the prefix always produce a URL.");
		let target = UpstreamTarget::parse(&inner, &root)
			.expect("Dot segments that stay under the prefix are allowed.");

		assert_eq!(target.url.as_str(), "https://example.com/oce/content/items/1");
	}
}
