//! Process-wide credential cache with single-flight refresh.
//!
//! [`CredentialStore`] answers "which `Authorization` value should this request carry?". Static
//! values and the no-auth mode short-circuit without I/O. Provider-backed values are reused
//! while `now < expires_at - refresh_skew`; the first caller past that point takes the refresh
//! guard and calls the provider once, while concurrent callers wait on the same guard and pick up
//! the replacement instead of stampeding the identity service. A failed fetch leaves the cached
//! state untouched and hands the error to the caller that triggered it.

// self
use crate::{
	_prelude::*,
	auth::{CachedCredential, Secret},
	obs::{FlowKind, FlowSpan},
	provider::CredentialProvider,
};

/// Where authorization values come from.
#[derive(Clone)]
pub enum CredentialSource {
	/// Upstream calls carry no `Authorization` header.
	None,
	/// A preformed value sent verbatim and never refreshed.
	Static(Secret),
	/// Expiring values obtained from a provider.
	Provider(Arc<dyn CredentialProvider>),
}
impl CredentialSource {
	/// Returns a stable label for logs.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Static(_) => "static",
			Self::Provider(_) => "provider",
		}
	}
}
impl Debug for CredentialSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Shared credential cache consulted by every proxied request.
pub struct CredentialStore {
	source: CredentialSource,
	refresh_skew: Duration,
	cached: RwLock<Option<CachedCredential>>,
	refresh_guard: AsyncMutex<()>,
}
impl CredentialStore {
	/// Margin subtracted from the expiry before a cached value counts as stale.
	pub const DEFAULT_REFRESH_SKEW: Duration = Duration::seconds(5);

	/// Creates an empty store for `source`.
	pub fn new(source: CredentialSource) -> Self {
		Self {
			source,
			refresh_skew: Self::DEFAULT_REFRESH_SKEW,
			cached: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Store for deployments that send no credentials upstream.
	pub fn unauthenticated() -> Self {
		Self::new(CredentialSource::None)
	}

	/// Overrides the refresh skew (negative values clamp to zero).
	pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
		self.refresh_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Returns `true` when upstream calls must carry an `Authorization` header.
	pub fn requires_authorization(&self) -> bool {
		!matches!(self.source, CredentialSource::None)
	}

	/// Configured credential source.
	pub fn source(&self) -> &CredentialSource {
		&self.source
	}

	/// Returns the value for the next upstream call, refreshing it when stale.
	pub async fn authorization_value(&self) -> Result<Option<Secret>> {
		self.authorization_value_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`authorization_value`](Self::authorization_value) with an explicit clock.
	pub async fn authorization_value_at(&self, now: OffsetDateTime) -> Result<Option<Secret>> {
		let provider = match &self.source {
			CredentialSource::None => return Ok(None),
			CredentialSource::Static(value) => return Ok(Some(value.clone())),
			CredentialSource::Provider(provider) => provider,
		};

		if let Some(value) = self.usable_at(now) {
			return Ok(Some(value));
		}

		self.refresh_at(provider.as_ref(), now).await.map(Some)
	}

	/// Drops the cached value so the next caller refreshes.
	pub fn invalidate(&self) {
		*self.cached.write() = None;
	}

	/// Copy of the cached record, if any.
	pub fn snapshot(&self) -> Option<CachedCredential> {
		self.cached.read().clone()
	}

	fn usable_at(&self, now: OffsetDateTime) -> Option<Secret> {
		self.cached
			.read()
			.as_ref()
			.filter(|record| record.is_usable_at(now, self.refresh_skew))
			.map(|record| record.value.clone())
	}

	async fn refresh_at(
		&self,
		provider: &dyn CredentialProvider,
		now: OffsetDateTime,
	) -> Result<Secret> {
		let span = FlowSpan::new(FlowKind::CredentialRefresh, "refresh");

		span.instrument(async move {
			let _singleflight = self.refresh_guard.lock().await;

			// Another caller may have refreshed while this one waited for the guard.
			if let Some(value) = self.usable_at(now) {
				return Ok(value);
			}

			let issued = provider.fetch_credential().await?;
			let record = CachedCredential::from_issued(issued, now);
			let value = record.value.clone();

			tracing::info!(expires_at = %record.expires_at, "Credential refreshed.");

			*self.cached.write() = Some(record);

			Ok(value)
		})
		.await
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore")
			.field("source", &self.source)
			.field("refresh_skew", &self.refresh_skew)
			.field("cached", &*self.cached.read())
			.finish()
	}
}
