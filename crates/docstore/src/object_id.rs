//! Twelve-byte document identities compatible with MongoDB's `ObjectId`.
//!
//! Layout:
//!
//! | bytes | content |
//! |-------|---------|
//! | 0..4  | seconds since the Unix epoch, big-endian |
//! | 4..9  | process-unique value, derived once per process |
//! | 9..12 | counter, big-endian, seeded from the process value |
//!
//! The process-unique part is the head of a SHA-256 digest over the process id
//! and the first generation instant, which keeps ids from concurrently running
//! test processes apart without pulling in a random number generator.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use crate::error::FilterError;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

struct ProcessSeed {
    unique: [u8; 5],
    counter: AtomicU32,
}

fn process_seed() -> &'static ProcessSeed {
    static SEED: OnceLock<ProcessSeed> = OnceLock::new();
    SEED.get_or_init(|| {
        let now = Utc::now();
        let mut hasher = Sha256::new();
        hasher.update(std::process::id().to_be_bytes());
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        let digest = hasher.finalize();

        let mut unique = [0u8; 5];
        unique.copy_from_slice(&digest[..5]);
        let start = u32::from_be_bytes([0, digest[5], digest[6], digest[7]]);

        ProcessSeed {
            unique,
            counter: AtomicU32::new(start),
        }
    })
}

/// A 12-byte document identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh id, unique within this process.
    #[must_use]
    pub fn new() -> Self {
        let seed = process_seed();
        // Ids only need the low 32 bits of the timestamp, as MongoDB does.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = Utc::now().timestamp() as u32;
        let count = seed.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&seed.unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Build an id from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// The raw bytes of this id.
    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Seconds since the Unix epoch embedded in the id.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Lowercase hexadecimal form, 24 characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the 24-character hexadecimal form.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidObjectId`] when the input is not exactly
    /// 24 hexadecimal characters.
    pub fn parse_hex(s: &str) -> Result<Self, FilterError> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| FilterError::InvalidObjectId(format!("'{s}': {e}")))?;
        Ok(Self(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_hex(&text).map_err(serde::de::Error::custom)
    }
}
