//! Shared data types: identities, statute hashes and GA records

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use icn_config::TimingConfig;

/// Seconds since the Unix epoch
pub type Timestamp = u64;

/// An authenticated member or service identity (usually a DID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// SHA-256 digest of the statute text in force, hex encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatuteHash(#[serde(with = "hex::serde")] [u8; 32]);

impl StatuteHash {
    /// Hash a statute document
    pub fn digest(statute: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(statute.as_ref()).into())
    }

    /// Parse a 64 character hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The all-zero hash used before any statute was adopted
    pub fn is_unset(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for StatuteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Whether a GA follows the regular cadence or was convened by proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaCategory {
    #[default]
    Regular,
    Extraordinary,
}

impl GaCategory {
    pub fn from_extraordinary(is_extra: bool) -> Self {
        if is_extra {
            Self::Extraordinary
        } else {
            Self::Regular
        }
    }

    /// How far ahead of now a GA of this category may be placed
    pub fn timespan(self, timing: &TimingConfig) -> u64 {
        match self {
            Self::Regular => timing.timespan_ga,
            Self::Extraordinary => timing.timespan_ega,
        }
    }

    /// The start must lie strictly beyond now plus this
    pub fn closest_future(self, timing: &TimingConfig) -> u64 {
        match self {
            Self::Regular => timing.closest_future_ga,
            Self::Extraordinary => timing.closest_future_ega,
        }
    }

    /// Spacing required from neighbouring GAs, including the cross-category floor
    pub fn min_interval(self, timing: &TimingConfig) -> u64 {
        let own = match self {
            Self::Regular => timing.min_interval_ga,
            Self::Extraordinary => timing.min_interval_ega,
        };
        own.max(timing.min_interval_cross)
    }
}

impl fmt::Display for GaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => f.write_str("regular"),
            Self::Extraordinary => f.write_str("extraordinary"),
        }
    }
}

/// One scheduled General Assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaRecord {
    pub start_time: Timestamp,
    pub duration: u64,
    /// Next free offset for voting slots; `start_time <= watermark <= end_time()`
    pub current_end_watermark: Timestamp,
    /// Statute in force when the GA began; seeded by the cursor advancer
    pub statute: StatuteHash,
    pub category: GaCategory,
    pub delegate_election_time: Option<Timestamp>,
}

impl GaRecord {
    pub fn new(start_time: Timestamp, duration: u64, category: GaCategory) -> Self {
        Self {
            start_time,
            duration,
            current_end_watermark: start_time,
            statute: StatuteHash::default(),
            category,
            delegate_election_time: None,
        }
    }

    pub fn end_time(&self) -> Timestamp {
        self.start_time.saturating_add(self.duration)
    }

    pub fn has_started(&self, now: Timestamp) -> bool {
        now >= self.start_time
    }

    /// `now` lies within `[start_time, end_time)`
    pub fn is_in_progress(&self, now: Timestamp) -> bool {
        self.has_started(now) && now < self.end_time()
    }

    /// Seconds of the window not yet handed out as voting slots
    pub fn remaining_capacity(&self) -> u64 {
        self.end_time().saturating_sub(self.current_end_watermark)
    }
}

/// Read-only view of a GA window, as returned by accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaWindow {
    pub index: usize,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub category: GaCategory,
    pub delegate_election_time: Option<Timestamp>,
    pub remaining_capacity: u64,
}

impl GaWindow {
    pub fn from_record(index: usize, record: &GaRecord) -> Self {
        Self {
            index,
            start_time: record.start_time,
            end_time: record.end_time(),
            category: record.category,
            delegate_election_time: record.delegate_election_time,
            remaining_capacity: record.remaining_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statute_hash_hex_roundtrip() {
        let hash = StatuteHash::digest("Article 1: members meet at least once a year.");
        assert!(!hash.is_unset());
        assert!(StatuteHash::default().is_unset());

        let encoded = hash.to_string();
        assert_eq!(encoded.len(), 64);
        assert_eq!(StatuteHash::from_hex(&encoded).unwrap(), hash);

        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", encoded));
        assert_eq!(serde_json::from_str::<StatuteHash>(&json).unwrap(), hash);
        assert!(StatuteHash::from_hex("zz").is_err());
    }

    #[test]
    fn test_category_intervals_respect_cross_floor() {
        let timing = TimingConfig {
            min_interval_ega: 10,
            min_interval_cross: 50,
            ..TimingConfig::default()
        };
        assert_eq!(GaCategory::Extraordinary.min_interval(&timing), 50);
        assert_eq!(GaCategory::Regular.min_interval(&timing), timing.min_interval_ga);
    }

    #[test]
    fn test_record_window() {
        let record = GaRecord::new(1_000, 100, GaCategory::Regular);
        assert_eq!(record.current_end_watermark, 1_000);
        assert_eq!(record.end_time(), 1_100);
        assert!(!record.is_in_progress(999));
        assert!(record.is_in_progress(1_000));
        assert!(!record.is_in_progress(1_100));
        assert_eq!(record.remaining_capacity(), 100);
    }
}
