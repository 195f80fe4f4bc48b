//! Twelve-byte document identifiers.
//!
//! Identifiers travel over the API as 24 hex characters and are stored as raw
//! bytes. The layout of generated ids is `unix seconds (4, BE) | process
//! nonce (5) | counter (3, BE)`, so ids created by one process sort by
//! creation time.

use std::{
    fmt,
    str::FromStr,
    sync::{
        OnceLock,
        atomic::{AtomicU32, Ordering},
    },
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

const COUNTER_MASK: u32 = 0x00ff_ffff;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectIdError {
    #[error("object id must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("object id `{input}` is not valid hex")]
    InvalidHex { input: String },
    #[error("object id must be {expected} bytes, got {actual}")]
    InvalidBytes { expected: usize, actual: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ObjectId::LEN]);

impl ObjectId {
    pub const LEN: usize = 12;
    pub const HEX_LEN: usize = Self::LEN * 2;

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Parse the 24-character hex form. Upper- and lower-case digits are accepted.
    pub fn parse_hex(input: &str) -> Result<Self, ObjectIdError> {
        if input.len() != Self::HEX_LEN {
            return Err(ObjectIdError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: input.len(),
            });
        }

        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(input, &mut bytes).map_err(|_| ObjectIdError::InvalidHex {
            input: input.to_string(),
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Allocate a fresh identifier for a new document.
    pub fn generate() -> Self {
        let seconds = OffsetDateTime::now_utc().unix_timestamp().clamp(0, u32::MAX as i64) as u32;
        Self::with_parts(seconds, process_nonce(), next_counter())
    }

    fn with_parts(seconds: u32, nonce: [u8; 5], counter: u32) -> Self {
        let mut bytes = [0u8; Self::LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&nonce);
        bytes[9..].copy_from_slice(&(counter & COUNTER_MASK).to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Creation time encoded in the first four bytes.
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

fn process_nonce() -> [u8; 5] {
    static NONCE: OnceLock<[u8; 5]> = OnceLock::new();
    *NONCE.get_or_init(|| {
        let random = Uuid::new_v4();
        let mut nonce = [0u8; 5];
        nonce.copy_from_slice(&random.as_bytes()[..5]);
        nonce
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| {
            let seed = Uuid::new_v4();
            let bytes = seed.as_bytes();
            AtomicU32::new(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
        })
        .fetch_add(1, Ordering::Relaxed)
}

impl TryFrom<&[u8]> for ObjectId {
    type Error = ObjectIdError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::LEN] = value.try_into().map_err(|_| ObjectIdError::InvalidBytes {
            expected: Self::LEN,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
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

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_hex(&raw).map_err(de::Error::custom)
    }
}
