//! Proxy-level error types shared across configuration, credential, and upstream layers.

// self
use crate::_prelude::*;

/// Proxy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical proxy error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The credential provider could not produce a fresh authorization value.
	#[error("Token acquisition failed: {0}")]
	TokenAcquisition(#[from] TokenError),
	/// The upstream content service could not be reached or broke the exchange.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
}

/// Configuration and validation failures raised at startup or while building requests.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration file could not be read.
	#[error("Configuration file `{}` could not be read.", path.display())]
	ReadFile {
		/// Path that was requested.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration file is not valid TOML for the expected record.
	#[error("Configuration file `{}` is malformed.", path.display())]
	ParseFile {
		/// Path that was requested.
		path: PathBuf,
		/// Underlying TOML failure.
		#[source]
		source: toml::de::Error,
	},
	/// A configured URL cannot be parsed.
	#[error("Configured `{key}` is not a valid URL.")]
	InvalidUrl {
		/// Configuration key holding the URL.
		key: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured URL uses a scheme other than `http`/`https`.
	#[error("Configured `{key}` uses unsupported scheme `{scheme}`.")]
	UnsupportedScheme {
		/// Configuration key holding the URL.
		key: &'static str,
		/// Offending scheme.
		scheme: String,
	},
	/// Only part of the OAuth 2.0 client-credentials parameter set is present.
	#[error("Client credentials are incomplete; missing {}.", missing.join(", "))]
	IncompleteClientCredentials {
		/// Configuration keys that were absent or blank.
		missing: Vec<&'static str>,
	},
	/// A secret cannot be used as an HTTP header value.
	#[error("Authorization value contains characters that are not valid in an HTTP header.")]
	InvalidHeaderValue(#[from] axum::http::header::InvalidHeaderValue),
	/// The listener could not bind to the configured address.
	#[error("Failed to listen on {addr}.")]
	Bind {
		/// Requested socket address.
		addr: SocketAddr,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The server loop stopped with an IO failure.
	#[error("Server loop failed.")]
	Serve(#[source] std::io::Error),
	/// A global tracing subscriber was already installed.
	#[error("Tracing subscriber could not be installed.")]
	Subscriber {
		/// Underlying subscriber failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while exchanging client credentials for a bearer token.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Underlying HTTP client reported a network failure.
	#[error("network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Token endpoint answered with a non-success status.
	#[error("token endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Preview of the response body or a locally produced summary.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive duration.
	#[error("the expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("the expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned an `access_token` that cannot travel in an HTTP header.
	#[error("the access_token value is not a valid HTTP header value.")]
	InvalidAccessToken,
}
impl TokenError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TokenError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Failures raised while talking to the upstream content service.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// The computed upstream URL cannot be parsed.
	#[error("Upstream URL `{url}` is invalid.")]
	InvalidUrl {
		/// The URL string that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The resolved upstream path left the proxied namespace (e.g., through `..` segments).
	#[error("Upstream path `{path}` is outside the proxied namespace.")]
	OutsideProxyPrefix {
		/// Resolved upstream path.
		path: String,
	},
	/// The upstream URL uses a scheme with no matching transport.
	#[error("Upstream URL uses unsupported scheme `{scheme}`.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream content service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_errors_are_labelled_as_acquisition_failures() {
		let error: Error = TokenError::Endpoint { message: "denied".into(), status: Some(401) }.into();

		assert!(error.to_string().starts_with("Token acquisition failed"));
		assert!(error.to_string().contains("denied"));

		let source = StdError::source(&error)
			.expect("Token acquisition errors should expose the token error as their source.");

		assert!(source.to_string().contains("unexpected response"));
	}

	#[test]
	fn incomplete_credentials_list_missing_keys() {
		let error = ConfigError::IncompleteClientCredentials {
			missing: vec!["clientSecret", "idcsURL"],
		};

		assert_eq!(
			error.to_string(),
			"Client credentials are incomplete; missing clientSecret, idcsURL."
		);
	}
}
