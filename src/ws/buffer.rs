//! Typed f32 arrays on the wire
//!
//! Raw bytes are not self-describing, so numeric arrays travel as base64 of
//! little-endian f32 values and are rebuilt into `Vec<f32>` on receipt.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::protocol::ProtocolError;

/// `Vec<f32>` that serializes as a base64 string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct F32Buffer(pub Vec<f32>);

impl F32Buffer {
    pub fn encode(values: &[f32]) -> String {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        STANDARD.encode(bytes)
    }

    pub fn decode(text: &str) -> Result<Vec<f32>, ProtocolError> {
        let bytes = STANDARD
            .decode(text)
            .map_err(|e| ProtocolError::Buffer(e.to_string()))?;
        if bytes.len() % 4 != 0 {
            return Err(ProtocolError::Buffer(format!(
                "{} bytes is not a whole number of f32 values",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for F32Buffer {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl Serialize for F32Buffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Self::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for F32Buffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::decode(&text).map(Self).map_err(de::Error::custom)
    }
}
