use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A closed tagged union standing in for free-form `map[string]interface{}`
/// fields in the source system (audit payloads, policy rule values,
/// rotation parameters). Only the JSON I/O boundary (QR `app_info`, raw
/// client payloads) keeps a genuine `serde_json::Value` escape hatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<MetadataValue>),
    Map(HashMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

pub type Metadata = HashMap<String, MetadataValue>;
