//! Rendering of the export's epoch-seconds floats.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Formats an epoch-seconds float as RFC 3339, or `None` for values the
/// calendar cannot hold.
#[must_use]
pub fn format_epoch_seconds(seconds: f64) -> Option<String> {
    if !seconds.is_finite() {
        return None;
    }
    let nanos = (seconds * NANOS_PER_SECOND) as i128;
    let timestamp = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    timestamp.format(&Rfc3339).ok()
}
