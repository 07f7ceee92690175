//! Streams one request to the upstream content service and the answer back.
//!
//! Neither direction is buffered: the inbound body is handed to reqwest as a stream, and the
//! upstream body is handed to axum as a stream, so chunks flow through in order as they arrive.
//! Dropping the returned response (e.g., because the browser went away) drops the upstream
//! stream and with it the outbound connection.

// crates.io
use axum::{
	body::{Body, HttpBody},
	extract::Request,
	http::HeaderMap,
	response::Response,
};
use futures::TryStreamExt;
// self
use crate::{_prelude::*, error::UpstreamError, http, proxy::UpstreamTarget};

/// Forwards requests over the shared reqwest client.
#[derive(Clone, Debug)]
pub struct ProxyExecutor {
	http_client: ReqwestClient,
}
impl ProxyExecutor {
	/// Wraps the shared client.
	pub fn new(http_client: ReqwestClient) -> Self {
		Self { http_client }
	}

	/// Sends `request` to `target` with `extra_headers` layered over its own headers.
	///
	/// The future resolves once the upstream status and headers are known; the body keeps
	/// streaming afterwards.
	pub async fn execute(
		&self,
		request: Request,
		target: &UpstreamTarget,
		extra_headers: HeaderMap,
	) -> Result<Response, UpstreamError> {
		let (parts, body) = request.into_parts();
		let mut headers = http::forwardable_headers(&parts.headers);

		headers.extend(extra_headers);

		let mut outbound =
			self.http_client.request(parts.method, target.url.clone()).headers(headers);

		if body.size_hint().exact() != Some(0) {
			outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
		}

		let upstream = outbound.send().await?;
		let status = upstream.status();

		tracing::debug!(
			transport = target.transport.as_str(),
			status = status.as_u16(),
			"Upstream responded."
		);

		let headers = http::forwardable_headers(upstream.headers());
		let stream = upstream.bytes_stream().map_err(|e| {
			tracing::warn!(error = %e, "Upstream body stream broke.");

			std::io::Error::other(e)
		});
		let mut response = Response::new(Body::from_stream(stream));

		*response.status_mut() = status;
		*response.headers_mut() = headers;

		Ok(response)
	}
}
