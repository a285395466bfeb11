// SPDX-License-Identifier: Apache-2.0

use crate::dataset::{AttrValue, Attributes, DatasetError, DatasetHandle, DatasetOpener, Variable};
use std::collections::BTreeMap;
use std::ops::Range;

/// Array variable held in memory, row-major over `shape`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryVariable {
    name: String,
    dimensions: Vec<String>,
    shape: Vec<usize>,
    data: Vec<f64>,
    attributes: Attributes,
    fail_reads: bool,
}

impl MemoryVariable {
    /// One-dimensional variable along `dimension`.
    #[must_use]
    pub fn new(name: &str, dimension: &str, data: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            dimensions: vec![dimension.to_string()],
            shape: vec![data.len()],
            data,
            attributes: Attributes::new(),
            fail_reads: false,
        }
    }

    pub fn with_shape(
        name: &str,
        dimensions: &[&str],
        shape: &[usize],
        data: Vec<f64>,
    ) -> Result<Self, DatasetError> {
        if dimensions.len() != shape.len() {
            return Err(DatasetError(format!(
                "variable `{name}` has {} dimensions but shape of rank {}",
                dimensions.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DatasetError(format!(
                "variable `{name}` expects {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            data,
            attributes: Attributes::new(),
            fail_reads: false,
        })
    }

    #[must_use]
    pub fn attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Makes every read fail, as a dropped connection would.
    #[must_use]
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }
}

impl Variable for MemoryVariable {
    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn read(&self, range: Range<usize>, stride: usize) -> Result<Vec<f64>, DatasetError> {
        if self.fail_reads {
            return Err(DatasetError(format!("read of `{}` failed", self.name)));
        }
        if stride == 0 {
            return Err(DatasetError("stride must be at least 1".to_string()));
        }
        let width = self.row_width().max(1);
        let end = range.end.min(self.len());
        let mut out = Vec::new();
        for row in (range.start..end).step_by(stride) {
            out.extend_from_slice(&self.data[row * width..(row + 1) * width]);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDataset {
    url: String,
    globals: Attributes,
    variables: BTreeMap<String, MemoryVariable>,
}

impl MemoryDataset {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn global(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.globals.insert(key, value);
        self
    }

    #[must_use]
    pub fn variable(mut self, variable: MemoryVariable) -> Self {
        self.variables.insert(variable.name.clone(), variable);
        self
    }
}

impl DatasetHandle for MemoryDataset {
    fn url(&self) -> &str {
        &self.url
    }

    fn global_attributes(&self) -> &Attributes {
        &self.globals
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn variable(&self, name: &str) -> Option<&dyn Variable> {
        self.variables.get(name).map(|v| v as &dyn Variable)
    }
}

/// Serves registered in-memory datasets by URL.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    datasets: BTreeMap<String, MemoryDataset>,
}

impl MemoryOpener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, dataset: MemoryDataset) -> Self {
        self.insert(dataset);
        self
    }

    pub fn insert(&mut self, dataset: MemoryDataset) {
        self.datasets.insert(dataset.url.clone(), dataset);
    }
}

impl DatasetOpener for MemoryOpener {
    fn open(&self, url: &str) -> Result<Box<dyn DatasetHandle>, DatasetError> {
        self.datasets
            .get(url)
            .cloned()
            .map(|d| Box::new(d) as Box<dyn DatasetHandle>)
            .ok_or_else(|| DatasetError(format!("no dataset published at {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_read_of_two_dimensional_variable() {
        let v = MemoryVariable::with_shape(
            "temp",
            &["time", "depth"],
            &[3, 2],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .expect("shape");
        assert_eq!(v.read(0..3, 2).expect("read"), vec![1.0, 2.0, 5.0, 6.0]);
        assert_eq!(v.read(1..10, 1).expect("read"), vec![3.0, 4.0, 5.0, 6.0]);
        assert!(v.read(5..9, 1).expect("read").is_empty());
        assert!(v.read(0..1, 0).is_err());
    }

    #[test]
    fn opener_reports_unknown_urls() {
        let opener = MemoryOpener::new().with(MemoryDataset::new("memory://a"));
        assert!(opener.open("memory://a").is_ok());
        assert!(opener.open("memory://b").is_err());
    }
}
