// SPDX-License-Identifier: Apache-2.0

use crate::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const STORE_ALIAS_MAX_LEN: usize = 64;

/// Name of one backing measurement store, e.g. a campaign database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub struct StoreAlias(String);

impl StoreAlias {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("store alias must not be empty".to_string()));
        }
        if s.len() > STORE_ALIAS_MAX_LEN {
            return Err(ValidationError(format!(
                "store alias exceeds max length {STORE_ALIAS_MAX_LEN}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError(format!(
                "store alias `{s}` must contain only [A-Za-z0-9_-]"
            )));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn default_alias() -> Self {
        Self("default".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for StoreAlias {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for StoreAlias {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StoreAlias> for String {
    fn from(value: StoreAlias) -> Self {
        value.0
    }
}

/// A platform and the set of files it publishes under one base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformDescriptor {
    pub name: String,
    pub platform_type: String,
    pub base_url: String,
    pub files: Vec<String>,
    pub parameters: Vec<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default = "default_stride")]
    pub stride: usize,
}

fn default_stride() -> usize {
    1
}

impl PlatformDescriptor {
    #[must_use]
    pub fn file_url(&self, file: &str) -> String {
        if self.base_url.is_empty() || self.base_url.ends_with('/') {
            format!("{}{file}", self.base_url)
        } else {
            format!("{}/{file}", self.base_url)
        }
    }

    #[must_use]
    pub fn activity_name(&self, file: &str) -> String {
        format!("{file} (stride={})", self.stride.max(1))
    }
}
