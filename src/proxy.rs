//! Request routing for the `/content/` prefix.
//!
//! [`ProxyRouter`] checks the method, builds the upstream URL, asks the
//! [`CredentialStore`] for an `Authorization` value when one is required, and hands the request
//! to the [`ProxyExecutor`]. Only `GET` is forwarded; other methods never reach the upstream and,
//! under the default [`MethodPolicy::Ignore`], are left unanswered until the server shuts down.

pub mod executor;
pub mod target;

pub use executor::*;
pub use target::*;

// crates.io
use axum::{
	Router,
	extract::{Request, State},
	http::{HeaderMap, Method, StatusCode, header::AUTHORIZATION},
	response::{IntoResponse, Response},
	routing::any,
};
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	config::MethodPolicy,
	error::UpstreamError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CredentialStore,
};

const ROUTE: &str = "/content/{*rest}";

/// Routes `/content/` requests to the upstream content service.
#[derive(Clone, Debug)]
pub struct ProxyRouter {
	server_url: String,
	content_root: String,
	store: Arc<CredentialStore>,
	executor: ProxyExecutor,
	method_policy: MethodPolicy,
	shutdown: Arc<watch::Sender<bool>>,
}
impl ProxyRouter {
	/// Creates a router forwarding to `server_url`.
	pub fn new(server_url: &Url, store: Arc<CredentialStore>, executor: ProxyExecutor) -> Self {
		Self {
			server_url: server_url.as_str().to_owned(),
			content_root: content_root(server_url),
			store,
			executor,
			method_policy: MethodPolicy::default(),
			shutdown: Arc::new(watch::channel(false).0),
		}
	}

	/// Overrides how non-`GET` requests are treated.
	pub fn with_method_policy(mut self, policy: MethodPolicy) -> Self {
		self.method_policy = policy;

		self
	}

	/// Shared credential store.
	pub fn store(&self) -> &Arc<CredentialStore> {
		&self.store
	}

	/// Releases every request held open by [`MethodPolicy::Ignore`].
	///
	/// Clones of this router share the signal.
	pub fn begin_shutdown(&self) {
		self.shutdown.send_replace(true);
	}

	/// Resolves once [`begin_shutdown`](Self::begin_shutdown) has been called.
	pub async fn until_shutdown(&self) {
		let mut stopping = self.shutdown.subscribe();

		// The sender lives in `self`, so waiting only ends on the signal.
		let _ = stopping.wait_for(|value| *value).await;
	}

	/// Upstream URL for an inbound path-and-query, if it falls under the proxy prefix.
	pub fn upstream_url(&self, path_and_query: &str) -> Option<String> {
		upstream_url(&self.server_url, path_and_query)
	}

	/// Proxies `request`, or returns `Ok(None)` when it is not forwarded.
	///
	/// Requests outside [`PROXY_PREFIX`] and requests with a method other than `GET` are not
	/// forwarded and cause no upstream traffic.
	pub async fn handle(&self, request: Request) -> Result<Option<Response>> {
		if request.method() != Method::GET {
			return Ok(None);
		}

		let Some(raw_url) =
			request.uri().path_and_query().and_then(|value| self.upstream_url(value.as_str()))
		else {
			return Ok(None);
		};
		let target = UpstreamTarget::parse(&raw_url, &self.content_root)?;
		let mut extra_headers = HeaderMap::new();

		if let Some(value) = self.store.authorization_value().await? {
			extra_headers.insert(AUTHORIZATION, value.to_header_value()?);
		}

		tracing::debug!(upstream = %target.url, "Forwarding request.");

		Ok(Some(self.executor.execute(request, &target, extra_headers).await?))
	}

	/// Builds the axum router serving [`PROXY_PREFIX`] and everything below it.
	pub fn into_router(self) -> Router {
		Router::new()
			.route(PROXY_PREFIX, any(forward))
			.route(ROUTE, any(forward))
			.with_state(Arc::new(self))
	}
}

/// Error wrapper that turns proxy failures into responses.
#[derive(Debug)]
pub struct ProxyError(pub Error);
impl From<Error> for ProxyError {
	fn from(err: Error) -> Self {
		Self(err)
	}
}
impl IntoResponse for ProxyError {
	fn into_response(self) -> Response {
		let status = match &self.0 {
			Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Error::Upstream(UpstreamError::OutsideProxyPrefix { .. }) => StatusCode::BAD_REQUEST,
			Error::TokenAcquisition(_) | Error::Upstream(_) => StatusCode::BAD_GATEWAY,
		};

		tracing::warn!(error = %self.0, status = status.as_u16(), "Proxied request failed.");

		status.into_response()
	}
}

async fn forward(State(proxy): State<Arc<ProxyRouter>>, request: Request) -> Response {
	const KIND: FlowKind = FlowKind::Proxy;

	let method = request.method().clone();
	let span = FlowSpan::new(KIND, "forward");

	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	match span.instrument(proxy.handle(request)).await {
		Ok(Some(response)) => {
			obs::record_flow_outcome(KIND, FlowOutcome::Success);

			response
		},
		Ok(None) => {
			tracing::debug!(%method, "Request not forwarded.");

			match proxy.method_policy {
				MethodPolicy::Ignore => {
					proxy.until_shutdown().await;

					StatusCode::SERVICE_UNAVAILABLE.into_response()
				},
				MethodPolicy::Reject => StatusCode::METHOD_NOT_ALLOWED.into_response(),
			}
		},
		Err(e) => {
			obs::record_flow_outcome(KIND, FlowOutcome::Failure);

			ProxyError(e).into_response()
		},
	}
}
