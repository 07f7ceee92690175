//! Credential records handed out by providers and cached by the store.

// self
use crate::{_prelude::*, auth::Secret};

/// Lifecycle status of a cached credential relative to an instant and refresh skew.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Credential may be reused as-is.
	Active,
	/// Credential is still technically valid but falls inside the refresh skew.
	RefreshDue,
	/// Credential reached its expiry instant.
	Expired,
}

/// Fresh credential returned by a provider, expressed relative to the moment it was issued.
#[derive(Clone, Debug)]
pub struct IssuedCredential {
	/// Complete `Authorization` header value (e.g., `Bearer <token>`).
	pub value: Secret,
	/// Lifetime reported by the identity service.
	pub expires_in: Duration,
}

/// Credential held by the store together with its absolute expiry.
#[derive(Clone, Serialize, Deserialize)]
pub struct CachedCredential {
	/// Complete `Authorization` header value.
	pub value: Secret,
	/// Instant the store accepted the credential.
	pub fetched_at: OffsetDateTime,
	/// Instant after which the credential must not be sent.
	pub expires_at: OffsetDateTime,
}
impl CachedCredential {
	/// Anchors an issued credential at `now`.
	pub fn from_issued(issued: IssuedCredential, now: OffsetDateTime) -> Self {
		Self { value: issued.value, fetched_at: now, expires_at: now + issued.expires_in }
	}

	/// Computes the status at `instant` given the refresh skew.
	///
	/// The credential stays active while `instant < expires_at - skew`.
	pub fn status_at(&self, instant: OffsetDateTime, skew: Duration) -> CredentialStatus {
		if instant >= self.expires_at {
			return CredentialStatus::Expired;
		}
		if instant >= self.expires_at - skew {
			return CredentialStatus::RefreshDue;
		}

		CredentialStatus::Active
	}

	/// Returns `true` if the credential can be reused at `instant`.
	pub fn is_usable_at(&self, instant: OffsetDateTime, skew: Duration) -> bool {
		matches!(self.status_at(instant, skew), CredentialStatus::Active)
	}
}
impl Debug for CachedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedCredential")
			.field("value", &"<redacted>")
			.field("fetched_at", &self.fetched_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
