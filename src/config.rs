//! Startup configuration: the TOML record, the command line, and credential-source resolution.

// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::ConfigError,
	provider::{ClientCredentials, ClientCredentialsProvider},
	store::CredentialSource,
};

/// Port used when neither the command line nor the file names one.
pub const DEFAULT_PORT: u16 = 8080;

/// Command line accepted by the `content-proxy` binary.
#[derive(Clone, Debug, Parser)]
#[command(name = "content-proxy", version, about)]
pub struct Cli {
	/// Path prefix under which static assets are mounted (e.g. `/blog`).
	pub root: String,
	/// TOML file holding the content service and credential settings.
	#[arg(short, long, env = "CONTENT_PROXY_CONFIG", default_value = "content-proxy.toml")]
	pub config: PathBuf,
	/// Listening port; overrides `expressServerPort`.
	#[arg(short, long)]
	pub port: Option<u16>,
	/// Default log filter when `RUST_LOG` is unset.
	#[arg(long, default_value = "info")]
	pub log: String,
}

/// Behavior for non-`GET` requests under the proxy prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodPolicy {
	/// Leave the request unanswered and make no upstream call.
	#[default]
	Ignore,
	/// Answer `405 Method Not Allowed` without contacting the upstream.
	Reject,
}

/// Credential source resolved from the configuration record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMode {
	/// No credentials are attached upstream.
	None,
	/// A preformed `Authorization` value.
	Static(Secret),
	/// OAuth 2.0 client-credentials grant.
	ClientCredentials(ClientCredentials),
}
impl AuthMode {
	/// Turns the mode into a store source, wiring providers to `http_client`.
	pub fn into_source(self, http_client: ReqwestClient) -> Result<CredentialSource, ConfigError> {
		Ok(match self {
			Self::None => CredentialSource::None,
			Self::Static(value) => {
				value.to_header_value()?;

				CredentialSource::Static(value)
			},
			Self::ClientCredentials(credentials) => CredentialSource::Provider(Arc::new(
				ClientCredentialsProvider::new(&credentials, http_client)?,
			)),
		})
	}
}

/// Configuration record read once at startup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
	/// Base URL of the upstream content service.
	pub server_url: String,
	/// Content API version used by the query client.
	#[serde(default)]
	pub api_version: Option<String>,
	/// Channel token used by the query client.
	#[serde(default)]
	pub channel_token: Option<String>,
	/// Preformed `Authorization` header value.
	#[serde(default)]
	pub auth: Option<Secret>,
	/// OAuth 2.0 client identifier.
	#[serde(default)]
	pub client_id: Option<String>,
	/// OAuth 2.0 client secret.
	#[serde(default)]
	pub client_secret: Option<Secret>,
	/// Scope requested with the client-credentials grant.
	#[serde(default, rename = "clientScopeURL")]
	pub client_scope_url: Option<String>,
	/// Base URL of the identity service.
	#[serde(default, rename = "idcsURL")]
	pub idcs_url: Option<String>,
	/// Listening port.
	#[serde(default, rename = "expressServerPort")]
	pub listen_port: Option<u16>,
	/// Directory served under the mount root.
	#[serde(default)]
	pub static_dir: Option<PathBuf>,
	/// Handling of non-`GET` requests under the proxy prefix.
	#[serde(default)]
	pub unsupported_methods: MethodPolicy,
}
impl ProxyConfig {
	/// Reads and parses the TOML file at `path`.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::ReadFile { path: path.to_owned(), source })?;

		toml::from_str(&raw).map_err(|source| ConfigError::ParseFile { path: path.to_owned(), source })
	}

	/// Validated content service URL.
	pub fn server_url(&self) -> Result<Url, ConfigError> {
		parse_http_url("serverUrl", &self.server_url)
	}

	/// Listening port, falling back to [`DEFAULT_PORT`].
	pub fn port(&self) -> u16 {
		self.listen_port.unwrap_or(DEFAULT_PORT)
	}

	/// Resolves the single active credential source.
	///
	/// A non-blank static value wins. Otherwise the four client-credentials keys must be present
	/// together; a partial set is rejected. With neither, no authorization is attached.
	pub fn auth_mode(&self) -> Result<AuthMode, ConfigError> {
		if let Some(value) = self.auth.as_ref().filter(|value| !value.is_blank()) {
			return Ok(AuthMode::Static(value.clone()));
		}

		let client_id = non_blank(self.client_id.as_deref());
		let client_secret = self.client_secret.as_ref().filter(|value| !value.is_blank());
		let scope = non_blank(self.client_scope_url.as_deref());
		let idcs_url = non_blank(self.idcs_url.as_deref());

		match (client_id, client_secret, scope, idcs_url) {
			(None, None, None, None) => Ok(AuthMode::None),
			(Some(client_id), Some(client_secret), Some(scope), Some(idcs_url)) =>
				Ok(AuthMode::ClientCredentials(ClientCredentials {
					client_id: client_id.to_owned(),
					client_secret: client_secret.clone(),
					scope: scope.to_owned(),
					identity_service_url: parse_http_url("idcsURL", idcs_url)?,
				})),
			(client_id, client_secret, scope, idcs_url) => {
				let missing = [
					("clientId", client_id.is_none()),
					("clientSecret", client_secret.is_none()),
					("clientScopeURL", scope.is_none()),
					("idcsURL", idcs_url.is_none()),
				]
				.into_iter()
				.filter_map(|(key, absent)| absent.then_some(key))
				.collect();

				Err(ConfigError::IncompleteClientCredentials { missing })
			},
		}
	}
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_http_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { key, source })?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		scheme => Err(ConfigError::UnsupportedScheme { key, scheme: scheme.to_owned() }),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, fs, process};
	// self
	use super::*;

	fn base() -> ProxyConfig {
		ProxyConfig { server_url: "https://content.example.com".into(), ..Default::default() }
	}

	fn oauth() -> ProxyConfig {
		ProxyConfig {
			client_id: Some("client-id".into()),
			client_secret: Some(Secret::new("client-secret")),
			client_scope_url: Some("https://content.example.com/urn:opc:cec:all".into()),
			idcs_url: Some("https://idcs.example.com".into()),
			..base()
		}
	}

	#[test]
	fn parses_original_key_names() {
		let config: ProxyConfig = toml::from_str(
			r#"
			serverUrl = "https://content.example.com/oce"
			apiVersion = "v1.1"
			channelToken = "channel"
			clientId = "id"
			clientSecret = "secret"
			clientScopeURL = "https://content.example.com/urn:opc:cec:all"
			idcsURL = "https://idcs.example.com"
			expressServerPort = 9090
			staticDir = "client"
			unsupportedMethods = "reject"
			"#,
		)
		.expect("Configuration fixture should parse.");

		assert_eq!(config.server_url, "https://content.example.com/oce");
		assert_eq!(config.api_version.as_deref(), Some("v1.1"));
		assert_eq!(config.port(), 9090);
		assert_eq!(config.static_dir, Some(PathBuf::from("client")));
		assert_eq!(config.unsupported_methods, MethodPolicy::Reject);
		assert!(matches!(
			config.auth_mode().expect("Complete client credentials should resolve."),
			AuthMode::ClientCredentials(_)
		));
	}

	#[test]
	fn defaults_apply_when_keys_are_absent() {
		let config: ProxyConfig = toml::from_str(r#"serverUrl = "http://localhost:8000""#)
			.expect("Minimal configuration should parse.");

		assert_eq!(config.port(), DEFAULT_PORT);
		assert_eq!(config.unsupported_methods, MethodPolicy::Ignore);
		assert_eq!(config.auth_mode().expect("Empty credentials resolve to none."), AuthMode::None);
	}

	#[test]
	fn static_value_wins_over_client_credentials() {
		let config = ProxyConfig { auth: Some(Secret::new("Basic abc")), ..oauth() };

		assert_eq!(
			config.auth_mode().expect("Static values always resolve."),
			AuthMode::Static(Secret::new("Basic abc"))
		);
	}

	#[test]
	fn blank_values_count_as_absent() {
		let config = ProxyConfig {
			auth: Some(Secret::new("  ")),
			client_id: Some(String::new()),
			..base()
		};

		assert_eq!(config.auth_mode().expect("Blank values resolve to none."), AuthMode::None);
	}

	#[test]
	fn partial_client_credentials_are_rejected() {
		let config = ProxyConfig { idcs_url: None, client_secret: None, ..oauth() };
		let err = config.auth_mode().expect_err("Partial credentials must be rejected.");

		assert!(matches!(
			err,
			ConfigError::IncompleteClientCredentials { ref missing }
				if missing == &vec!["clientSecret", "idcsURL"]
		));
	}

	#[test]
	fn server_url_requires_http_scheme() {
		assert!(base().server_url().is_ok());

		let err = ProxyConfig { server_url: "ftp://content.example.com".into(), ..base() }
			.server_url()
			.expect_err("Non-HTTP schemes must be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { key: "serverUrl", .. }));

		let err = ProxyConfig { server_url: "not a url".into(), ..base() }
			.server_url()
			.expect_err("Garbage must be rejected.");

		assert!(matches!(err, ConfigError::InvalidUrl { key: "serverUrl", .. }));
	}

	#[test]
	fn from_path_reads_toml_files() {
		let path = env::temp_dir().join(format!(
			"content_proxy_config_{}_{}.toml",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		));

		fs::write(&path, "serverUrl = \"https://content.example.com\"\nauth = \"Basic abc\"\n")
			.expect("Failed to write configuration fixture.");

		let config = ProxyConfig::from_path(&path).expect("Configuration file should load.");

		assert_eq!(config.server_url, "https://content.example.com");
		assert!(matches!(config.auth_mode(), Ok(AuthMode::Static(_))));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove configuration fixture {}: {e}", path.display())
		});

		let err = ProxyConfig::from_path(&path).expect_err("Missing files must fail.");

		assert!(matches!(err, ConfigError::ReadFile { .. }));
	}

	#[test]
	fn cli_requires_root() {
		assert!(Cli::try_parse_from(["content-proxy"]).is_err());

		let cli = Cli::try_parse_from(["content-proxy", "/blog", "--port", "9000"])
			.expect("Root plus port should parse.");

		assert_eq!(cli.root, "/blog");
		assert_eq!(cli.port, Some(9000));
	}
}
