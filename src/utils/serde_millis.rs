//! Serde helpers for `Duration` fields stored as whole milliseconds

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serialize a duration as milliseconds
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis().min(u64::MAX as u128) as u64)
}

/// Deserialize a duration from milliseconds
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
