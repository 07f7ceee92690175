//! Secure secret wrapper that redacts sensitive material.

// crates.io
use axum::http::HeaderValue;
// self
use crate::{_prelude::*, error::ConfigError};

/// Redacted secret wrapper keeping client secrets and authorization values out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Builds the `Bearer <token>` authorization value for an access token.
	pub fn bearer(access_token: &str) -> Self {
		Self(format!("Bearer {access_token}"))
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds nothing but whitespace.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}

	/// Converts the secret into a header value flagged as sensitive.
	pub fn to_header_value(&self) -> Result<HeaderValue, ConfigError> {
		let mut value = HeaderValue::from_str(&self.0)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = Secret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "Secret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn header_values_are_sensitive() {
		let value = Secret::bearer("abc")
			.to_header_value()
			.expect("Bearer values should be valid header values.");

		assert!(value.is_sensitive());
		assert_eq!(value.to_str().expect("Header should stay visible ASCII."), "Bearer abc");
		assert!(Secret::new("line\nbreak").to_header_value().is_err());
	}
}
