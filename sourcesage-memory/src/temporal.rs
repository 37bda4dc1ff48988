//! Record timestamps
//!
//! Timestamps are `DateTime<Utc>` and serialize as RFC 3339. Older snapshots
//! stored Unix-epoch seconds as floating point numbers; both forms are accepted
//! on read so those snapshots keep loading.

use chrono::{DateTime, Utc};

/// Current time, used for created/updated stamps
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert fractional Unix-epoch seconds into a UTC timestamp
pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

/// Serde adapter: writes RFC 3339, reads RFC 3339 or epoch seconds
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stamp {
        Rfc3339(DateTime<Utc>),
        Epoch(f64),
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Stamp::deserialize(deserializer)? {
            Stamp::Rfc3339(dt) => Ok(dt),
            Stamp::Epoch(secs) => super::from_epoch_seconds(secs)
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}"))),
        }
    }
}
