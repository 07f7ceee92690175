//! Listener wiring: the proxy routes, static assets under the mount root, and startup logging.

// crates.io
use axum::Router;
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::services::ServeDir;
// self
use crate::{
	_prelude::*,
	config::ProxyConfig,
	error::ConfigError,
	http,
	proxy::{ProxyExecutor, ProxyRouter},
	store::CredentialStore,
};

/// Fully wired proxy process ready to listen.
#[derive(Clone, Debug)]
pub struct ProxyServer {
	addr: SocketAddr,
	mount_root: String,
	static_dir: Option<PathBuf>,
	proxy: ProxyRouter,
}
impl ProxyServer {
	/// Wires the credential store, executor, and router described by `config`.
	///
	/// `port` overrides the configured listening port.
	pub fn from_config(config: &ProxyConfig, root: &str, port: Option<u16>) -> Result<Self> {
		Self::from_config_with_client(config, root, port, http::build_client()?)
	}

	/// Same as [`from_config`](Self::from_config) with a caller-supplied HTTP client shared by the
	/// credential provider and the proxy executor.
	pub fn from_config_with_client(
		config: &ProxyConfig,
		root: &str,
		port: Option<u16>,
		http_client: ReqwestClient,
	) -> Result<Self> {
		let server_url = config.server_url()?;
		let source = config.auth_mode()?.into_source(http_client.clone())?;

		tracing::info!(server_url = %server_url, credentials = source.as_str(), "Proxy configured.");

		let store = Arc::new(CredentialStore::new(source));
		let proxy = ProxyRouter::new(&server_url, store, ProxyExecutor::new(http_client))
			.with_method_policy(config.unsupported_methods);

		Ok(Self {
			addr: SocketAddr::from(([0, 0, 0, 0], port.unwrap_or_else(|| config.port()))),
			mount_root: normalize_root(root),
			static_dir: config.static_dir.clone(),
			proxy,
		})
	}

	/// Overrides the listening address.
	pub fn with_addr(mut self, addr: SocketAddr) -> Self {
		self.addr = addr;

		self
	}

	/// Normalized mount root (always starts with `/`, never ends with one unless it is `/`).
	pub fn mount_root(&self) -> &str {
		&self.mount_root
	}

	/// Proxy router backing the `/content/` routes.
	pub fn proxy(&self) -> &ProxyRouter {
		&self.proxy
	}

	/// Builds the complete axum application.
	pub fn router(&self) -> Router {
		let router = self.proxy.clone().into_router();

		match &self.static_dir {
			None => router,
			Some(dir) if self.mount_root == "/" => router.fallback_service(ServeDir::new(dir)),
			Some(dir) => router.nest_service(&self.mount_root, ServeDir::new(dir)),
		}
	}

	/// Binds the listener and serves until `shutdown` resolves.
	///
	/// Once `shutdown` resolves, requests held open by the ignore policy are released and the
	/// server stops after the in-flight requests finish.
	pub async fn run_with_shutdown(
		self,
		shutdown: impl Future<Output = ()> + Send + 'static,
	) -> Result<()> {
		let listener = self.bind().await?;

		self.serve(listener, shutdown).await
	}

	/// Binds the listener and serves on a background task, returning the bound address.
	pub async fn spawn(
		self,
		shutdown: impl Future<Output = ()> + Send + 'static,
	) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
		let listener = self.bind().await?;
		let addr = listener.local_addr().map_err(ConfigError::Serve)?;

		Ok((addr, tokio::spawn(self.serve(listener, shutdown))))
	}

	async fn serve(
		self,
		listener: TcpListener,
		shutdown: impl Future<Output = ()> + Send + 'static,
	) -> Result<()> {
		let proxy = self.proxy.clone();
		let shutdown = async move {
			shutdown.await;

			tracing::info!("Draining in-flight requests.");

			proxy.begin_shutdown();
		};

		axum::serve(listener, self.router())
			.with_graceful_shutdown(shutdown)
			.await
			.map_err(ConfigError::Serve)?;

		tracing::info!("Server stopped.");

		Ok(())
	}

	async fn bind(&self) -> Result<TcpListener> {
		let listener = TcpListener::bind(self.addr)
			.await
			.map_err(|source| ConfigError::Bind { addr: self.addr, source })?;
		let local_addr = listener.local_addr().map_err(ConfigError::Serve)?;

		tracing::info!(addr = %local_addr, root = %self.mount_root, "Listening.");

		Ok(listener)
	}
}

/// Normalizes a mount root to `/segment[/segment...]` or `/`.
pub fn normalize_root(root: &str) -> String {
	let trimmed = root.trim().trim_matches('/');

	if trimmed.is_empty() { "/".into() } else { format!("/{trimmed}") }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn roots_are_normalized() {
		assert_eq!(normalize_root(""), "/");
		assert_eq!(normalize_root("/"), "/");
		assert_eq!(normalize_root("blog"), "/blog");
		assert_eq!(normalize_root("/samples/blog/"), "/samples/blog");
	}

	#[test]
	fn from_config_applies_port_override() {
		let config = ProxyConfig {
			server_url: "https://content.example.com/".into(),
			listen_port: Some(9000),
			..Default::default()
		};
		let server = ProxyServer::from_config(&config, "blog", Some(9100))
			.expect("Minimal configuration should wire a server.");

		assert_eq!(server.addr.port(), 9100);
		assert_eq!(server.mount_root(), "/blog");
		assert!(!server.proxy().store().requires_authorization());

		let server = ProxyServer::from_config(&config, "/", None)
			.expect("Minimal configuration should wire a server.");

		assert_eq!(server.addr.port(), 9000);
	}

	#[test]
	fn from_config_rejects_partial_credentials() {
		let config = ProxyConfig {
			server_url: "https://content.example.com".into(),
			client_id: Some("only-the-id".into()),
			..Default::default()
		};
		let err = ProxyServer::from_config(&config, "/", None)
			.expect_err("Partial credentials must abort startup.");

		assert!(matches!(err, Error::Config(ConfigError::IncompleteClientCredentials { .. })));
	}
}
