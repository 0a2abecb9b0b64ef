//! Binary payloads and resource identity
//!
//! A [`Payload`] is the opaque blob exchanged between replicas: a snapshot is
//! a payload holding the full encoded value, and in the baseline contract a
//! delta is a payload of the same form. The only guarantee transports rely on
//! is the round trip: a payload produced by encoding a value on one replica
//! decodes to an equivalent value on another replica of the same value type.
//!
//! ## Format
//!
//! Values are encoded with MessagePack (`rmp-serde`), which is
//! self-delimiting: a decoder knows where the value ends without any outer
//! length prefix. A payload is exactly one encoded value: bytes left over
//! after the value ends make the payload invalid.

use crate::error::{Error, Result};
use serde::de::{self, DeserializeOwned, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Opaque binary payload carrying an encoded value
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wrap raw bytes without validation
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Payload(bytes.into())
    }

    /// Encode a value into a payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the value cannot be encoded.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Payload(rmp_serde::to_vec(value)?))
    }

    /// Decode the payload into a value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Deserialization` if the bytes are not a valid encoding
    /// of `T`, or if anything follows the encoded value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        decode_exact(&self.0)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length payload
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_byte_buf(PayloadVisitor)
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Payload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a byte buffer")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Payload, E> {
        Ok(Payload(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<Payload, E> {
        Ok(Payload(v))
    }

    // Self-describing formats without a native bytes type encode as a sequence
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Payload, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        Ok(Payload(bytes))
    }
}

/// Decode exactly one MessagePack value spanning all of `bytes`.
///
/// # Errors
///
/// `Error::Deserialization` if the value does not decode or trailing bytes
/// remain.
pub fn decode_exact<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = rmp_serde::Deserializer::new(bytes);
    let value = T::deserialize(&mut deserializer)?;
    let rest = deserializer.get_ref().len();
    if rest > 0 {
        return Err(Error::Deserialization(format!(
            "{} trailing bytes after encoded value",
            rest
        )));
    }
    Ok(value)
}

/// Name identifying a replicated resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a resource name
    pub fn new(name: impl Into<String>) -> Self {
        ResourceName(name.into())
    }

    /// Borrow as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self {
        ResourceName(s.to_string())
    }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self {
        ResourceName(s)
    }
}
