use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a record created by a bundle run.
///
/// Backed by 128 bits of randomness. Rendered as 32 lowercase hex characters
/// and written to the store as its 16 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Uuid);

impl Identifier {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parses the 32-character hex rendering produced by `Display`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let bytes: [u8; 16] = hex::decode(value).ok()?.try_into().ok()?;
        Some(Self::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).ok_or_else(|| de::Error::custom("invalid identifier"))
    }
}

/// Source of fresh identifiers.
pub trait IdentifierGenerator: Send + Sync {
    fn generate(&self) -> Identifier;
}

pub type IdentifierGeneratorBox = Box<dyn IdentifierGenerator>;

/// Generates random (v4) identifiers. Holds no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentifierGenerator;

impl IdentifierGenerator for RandomIdentifierGenerator {
    fn generate(&self) -> Identifier {
        Identifier(Uuid::new_v4())
    }
}
