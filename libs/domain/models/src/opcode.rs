use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated 6-character hierarchical geographic code: `school(2) |
/// area(2) | point(2)` (spec §3). Construction is the only place format
/// validity is enforced; once built, every consumer can trust the shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OpCode(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpCodeError {
    #[error("OP-Code must be exactly 6 uppercase alphanumeric characters")]
    InvalidFormat,
}

impl OpCode {
    pub fn parse(raw: &str) -> Result<Self, OpCodeError> {
        if raw.len() == 6 && raw.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
        {
            Ok(Self(raw.to_string()))
        } else {
            Err(OpCodeError::InvalidFormat)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn school(&self) -> &str {
        &self.0[0..2]
    }

    pub fn area(&self) -> &str {
        &self.0[0..4]
    }

    pub fn point(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OpCode {
    type Error = OpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OpCode> for String {
    fn from(value: OpCode) -> Self {
        value.0
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directory entry binding an `OpCode` to a physical delivery point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpCodeRecord {
    pub code: OpCode,
    pub school_name: String,
    pub area_name: String,
    pub building_type: String,
    pub point_type: String,
    pub is_public: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(OpCode::parse("BJDX0").is_err());
        assert!(OpCode::parse("BJDX011").is_err());
    }

    #[test]
    fn rejects_lowercase_and_symbols() {
        assert!(OpCode::parse("bjdx01").is_err());
        assert!(OpCode::parse("BJ-X01").is_err());
    }

    #[test]
    fn accepts_valid_code_and_exposes_prefixes() {
        let code = OpCode::parse("BJDX01").unwrap();
        assert_eq!(code.school(), "BJ");
        assert_eq!(code.area(), "BJDX");
        assert_eq!(code.point(), "BJDX01");
    }
}
