//! Creation/update timestamp policy.
//!
//! # Responsibility
//! - Read the wall clock once per stamping call.
//! - Keep instants in one canonical form: UTC, microsecond precision,
//!   RFC 3339 with six fractional digits.
//!
//! # Invariants
//! - A create stamp has `created_at == updated_at`.
//! - An update stamp keeps the existing `created_at` and yields an
//!   `updated_at` strictly greater than the existing one, even when the clock
//!   stalls or steps backwards.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use std::sync::Arc;

/// Source of "now" for the timestamp policy.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Read access to the timestamps of a persisted aggregate.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Timestamp pair produced by one stamping call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stamps aggregates on create and on every mutation.
#[derive(Clone)]
pub struct TimestampPolicy {
    clock: Arc<dyn Clock>,
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TimestampPolicy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Current instant in canonical precision.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    /// Stamp for a newly created aggregate: `created_at = updated_at = now`.
    pub fn stamp_create(&self) -> Stamp {
        let now = self.now();
        Stamp {
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp for a mutation of `existing`.
    pub fn stamp_update<T: Timestamped>(&self, existing: &T) -> Stamp {
        let floor = existing.updated_at() + Duration::microseconds(1);
        let now = self.now();
        Stamp {
            created_at: existing.created_at(),
            updated_at: if now >= floor { now } else { floor },
        }
    }
}

/// Formats an instant in the persisted form, e.g. `2026-10-19T08:15:30.123456Z`.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a persisted RFC 3339 instant into UTC.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|instant| instant.with_timezone(&Utc))
}

/// Serde adapter for `createdAt`/`updatedAt` fields.
pub mod rfc3339_micros {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        instant: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_instant(instant))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_instant(&raw).map_err(serde::de::Error::custom)
    }
}
