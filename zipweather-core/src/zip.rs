use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of characters in a US ZIP code.
pub const ZIP_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZipError {
    #[error("{input} has an invalid zip code length")]
    InvalidLength { input: String },
}

/// A ZIP code that has passed the length check.
///
/// Only the length is validated here. Whether the code names a real place is
/// decided by the weather provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZipCode(String);

impl ZipCode {
    pub fn parse(input: &str) -> Result<Self, ZipError> {
        if input.chars().count() != ZIP_LEN {
            return Err(ZipError::InvalidLength {
                input: input.to_owned(),
            });
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ZipCode {
    type Error = ZipError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ZipCode> for String {
    fn from(zip: ZipCode) -> Self {
        zip.0
    }
}

impl AsRef<str> for ZipCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
