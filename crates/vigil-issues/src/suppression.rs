//! Operator suppressions of known issues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_core::Fingerprint;

/// Explicit override keeping an issue out of scoring and fix packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    /// Issue identity the suppression applies to
    pub fingerprint: Fingerprint,
    /// Why the issue is suppressed
    pub reason: String,
    /// When the suppression was created
    pub created_at: DateTime<Utc>,
    /// When it stops applying; `None` never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl Suppression {
    /// Suppression that never expires.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            fingerprint,
            reason: reason.into(),
            created_at: now,
            expires_at: None,
        }
    }

    /// Set an expiry.
    #[must_use]
    pub fn until(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the suppression applies at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expiry| now < expiry)
    }
}
