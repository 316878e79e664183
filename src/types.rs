//! Core type definitions shared across the reconciliation engine.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a live object in the host catalog.
pub type ObjectId = u64;

/// The catalog root. Every top-level container is parented here.
pub const ROOT_ID: ObjectId = 0;

/// `liveObjectID` value of a tracked file with no bound live object.
pub const UNBOUND: ObjectId = 0;

/// Content digest (BLAKE3) of a script blob.
pub type Digest = [u8; 32];

/// Drift flag: absent, present, or present with an explanatory payload.
///
/// Serialized as `false`, `true` or the detail string, matching the
/// persisted tracked-file list format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Flag {
    #[default]
    Absent,
    Present,
    Detail(String),
}

impl Flag {
    pub fn detail(text: impl Into<String>) -> Self {
        Flag::Detail(text.into())
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Flag::Absent)
    }

    pub fn detail_text(&self) -> Option<&str> {
        match self {
            Flag::Detail(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Flag::Absent;
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Absent => write!(f, "-"),
            Flag::Present => write!(f, "yes"),
            Flag::Detail(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Flag::Absent => serializer.serialize_bool(false),
            Flag::Present => serializer.serialize_bool(true),
            Flag::Detail(text) => serializer.serialize_str(text),
        }
    }
}

struct FlagVisitor;

impl<'de> Visitor<'de> for FlagVisitor {
    type Value = Flag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean or a detail string")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Flag, E> {
        Ok(if value { Flag::Present } else { Flag::Absent })
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Flag, E> {
        Ok(Flag::Detail(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Flag, E> {
        Ok(Flag::Detail(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Flag, E> {
        Ok(Flag::Absent)
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FlagVisitor)
    }
}
