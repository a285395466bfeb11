// SPDX-License-Identifier: Apache-2.0

//! Read-only view of a remote gridded dataset: named variables with attributes
//! and strided reads along the leading dimension.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetError(pub String);

impl Display for DatasetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DatasetError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

impl AttrValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// All numeric values carried by the attribute. `None` when text does not parse.
    #[must_use]
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Self::Number(v) => Some(vec![*v]),
            Self::Numbers(vs) => Some(vs.clone()),
            Self::Text(s) => s
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| t.parse::<f64>().ok())
                .collect(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        Self::Numbers(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }
}

pub trait Variable {
    fn name(&self) -> &str;
    fn attributes(&self) -> &Attributes;
    fn dimensions(&self) -> &[String];
    fn shape(&self) -> &[usize];

    /// Reads rows `range.start, range.start + stride, ..` below `range.end` of the
    /// leading dimension, trailing dimensions whole, flattened row-major.
    fn read(&self, range: Range<usize>, stride: usize) -> Result<Vec<f64>, DatasetError>;

    fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element count of everything after the leading dimension.
    fn row_width(&self) -> usize {
        self.shape().iter().skip(1).product()
    }

    fn read_all(&self) -> Result<Vec<f64>, DatasetError> {
        self.read(0..self.len(), 1)
    }
}

pub trait DatasetHandle {
    fn url(&self) -> &str;
    fn global_attributes(&self) -> &Attributes;
    fn variable_names(&self) -> Vec<String>;
    fn variable(&self, name: &str) -> Option<&dyn Variable>;
}

pub trait DatasetOpener {
    fn open(&self, url: &str) -> Result<Box<dyn DatasetHandle>, DatasetError>;
}
