//! OAuth 2.0 client-credentials exchange against the identity service.
//!
//! Each fetch issues exactly one `POST {identity}/oauth2/v1/token` with HTTP Basic client
//! authentication and a `grant_type=client_credentials&scope=<encoded>` form body, then reads
//! `access_token` and `expires_in` from the JSON answer.

// crates.io
use axum::http::{
	HeaderValue,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{IssuedCredential, Secret},
	error::{ConfigError, TokenError},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{CredentialProvider, ProviderFuture},
};

const TOKEN_PATH: &str = "/oauth2/v1/token";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const BODY_PREVIEW_LIMIT: usize = 256;
// Keeps `now + expires_in` far away from the calendar range limits.
const MAX_EXPIRES_IN_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// OAuth 2.0 client-credentials parameters; all four are required together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: Secret,
	/// Scope requested for the content service.
	pub scope: String,
	/// Base URL of the identity service.
	pub identity_service_url: Url,
}
impl ClientCredentials {
	/// Token endpoint derived from the identity service URL.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		let base = self.identity_service_url.as_str().trim_end_matches('/');

		Url::parse(&format!("{base}{TOKEN_PATH}"))
			.map_err(|source| ConfigError::InvalidUrl { key: "idcsURL", source })
	}

	/// `Basic base64(client_id:client_secret)` header value.
	pub fn basic_authorization(&self) -> Secret {
		let raw = format!("{}:{}", self.client_id, self.client_secret.expose());

		Secret::new(format!("Basic {}", STANDARD.encode(raw)))
	}

	/// Form body carrying the grant type and the URL-encoded scope.
	pub fn token_request_body(&self) -> String {
		format!("grant_type=client_credentials&scope={}", urlencoding::encode(&self.scope))
	}
}

/// Provider performing the client-credentials grant over the shared reqwest client.
#[derive(Clone)]
pub struct ClientCredentialsProvider {
	http_client: ReqwestClient,
	token_endpoint: Url,
	basic_authorization: HeaderValue,
	body: String,
}
impl ClientCredentialsProvider {
	/// Prepares the provider; the token endpoint and Basic header are computed once.
	pub fn new(
		credentials: &ClientCredentials,
		http_client: ReqwestClient,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			http_client,
			token_endpoint: credentials.token_endpoint()?,
			basic_authorization: credentials.basic_authorization().to_header_value()?,
			body: credentials.token_request_body(),
		})
	}

	/// Token endpoint this provider posts to.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	async fn request_token(&self) -> Result<IssuedCredential, TokenError> {
		let response = self
			.http_client
			.post(self.token_endpoint.clone())
			.header(AUTHORIZATION, self.basic_authorization.clone())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.body(self.body.clone())
			.send()
			.await?;
		let status = response.status();
		let bytes = response.bytes().await?;

		if !status.is_success() {
			return Err(TokenError::Endpoint {
				message: body_preview(&bytes),
				status: Some(status.as_u16()),
			});
		}

		parse_token_response(&bytes, status.as_u16())
	}
}
impl CredentialProvider for ClientCredentialsProvider {
	fn fetch_credential(&self) -> ProviderFuture<'_> {
		const KIND: FlowKind = FlowKind::CredentialRefresh;

		let span = FlowSpan::new(KIND, "client_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		Box::pin(span.instrument(async move {
			let result = self.request_token().await;

			match &result {
				Ok(issued) => {
					tracing::debug!(expires_in = issued.expires_in.whole_seconds(), "Token issued.");
					obs::record_flow_outcome(KIND, FlowOutcome::Success);
				},
				Err(e) => {
					tracing::warn!(error = %e, "Token request failed.");
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				},
			}

			result
		}))
	}
}
impl Debug for ClientCredentialsProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsProvider")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("basic_authorization", &"<redacted>")
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: Option<i64>,
}

fn parse_token_response(bytes: &[u8], status: u16) -> Result<IssuedCredential, TokenError> {
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);
	let response: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| TokenError::ResponseParse { source, status })?;
	let expires_in = response.expires_in.ok_or(TokenError::MissingExpiresIn)?;

	if expires_in <= 0 {
		return Err(TokenError::NonPositiveExpiresIn);
	}
	if expires_in > MAX_EXPIRES_IN_SECS {
		return Err(TokenError::ExpiresInOutOfRange);
	}

	let value = Secret::bearer(&response.access_token);

	value.to_header_value().map_err(|_| TokenError::InvalidAccessToken)?;

	Ok(IssuedCredential { value, expires_in: Duration::seconds(expires_in) })
}

fn body_preview(bytes: &[u8]) -> String {
	let body = String::from_utf8_lossy(bytes);

	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.into_owned();
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credentials(identity: &str) -> ClientCredentials {
		ClientCredentials {
			client_id: "client-id".into(),
			client_secret: Secret::new("client-secret"),
			scope: "https://content.example.com/urn:opc:cec:all".into(),
			identity_service_url: Url::parse(identity).expect("Identity URL fixture should parse."),
		}
	}

	#[test]
	fn token_endpoint_has_single_separator() {
		for identity in ["https://idcs.example.com", "https://idcs.example.com/"] {
			let endpoint = credentials(identity)
				.token_endpoint()
				.expect("Token endpoint should derive from a valid identity URL.");

			assert_eq!(endpoint.as_str(), "https://idcs.example.com/oauth2/v1/token");
		}
	}

	#[test]
	fn basic_header_encodes_id_and_secret() {
		assert_eq!(
			credentials("https://idcs.example.com").basic_authorization().expose(),
			"Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ="
		);
	}

	#[test]
	fn form_body_encodes_scope() {
		assert_eq!(
			credentials("https://idcs.example.com").token_request_body(),
			"grant_type=client_credentials&scope=https%3A%2F%2Fcontent.example.com%2Furn%3Aopc%3Acec%3Aall"
		);
	}

	#[test]
	fn token_response_becomes_bearer_value() {
		let issued = parse_token_response(br#"{"access_token":"abc","expires_in":3600}"#, 200)
			.expect("Well-formed token responses should parse.");

		assert_eq!(issued.value.expose(), "Bearer abc");
		assert_eq!(issued.expires_in, Duration::hours(1));
	}

	#[test]
	fn token_response_rejects_missing_fields() {
		let err = parse_token_response(br#"{"expires_in":3600}"#, 200)
			.expect_err("Responses without access_token must fail.");

		assert!(matches!(err, TokenError::ResponseParse { status: 200, .. }));

		let err = parse_token_response(br#"{"access_token":"abc"}"#, 200)
			.expect_err("Responses without expires_in must fail.");

		assert!(matches!(err, TokenError::MissingExpiresIn));

		let err = parse_token_response(br#"{"access_token":"abc","expires_in":0}"#, 200)
			.expect_err("Zero lifetimes must fail.");

		assert!(matches!(err, TokenError::NonPositiveExpiresIn));
	}

	#[test]
	fn token_response_rejects_tokens_unusable_as_headers() {
		let err = parse_token_response(br#"{"access_token":"a\nb","expires_in":3600}"#, 200)
			.expect_err("Tokens with control characters must fail.");

		assert!(matches!(err, TokenError::InvalidAccessToken));
	}

	#[test]
	fn body_preview_truncates_long_payloads() {
		let preview = body_preview("x".repeat(BODY_PREVIEW_LIMIT + 10).as_bytes());

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
