// SPDX-License-Identifier: Apache-2.0

use crate::dataset::Variable;
use seastore_model::{Parameter, ParameterSpec};
use seastore_store::{MeasurementStore, StoreError};
use std::collections::HashMap;

/// Parameters registered during one load, keyed by name.
#[derive(Debug, Default)]
pub struct ParameterCache {
    by_name: HashMap<String, Parameter>,
    store_lookups: usize,
}

impl ParameterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_register(
        &mut self,
        store: &mut dyn MeasurementStore,
        spec: &ParameterSpec,
    ) -> Result<Parameter, StoreError> {
        if let Some(p) = self.by_name.get(&spec.name) {
            return Ok(p.clone());
        }
        self.store_lookups += 1;
        let parameter = store.register_parameter(spec)?;
        self.by_name.insert(spec.name.clone(), parameter.clone());
        Ok(parameter)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Number of round trips to the store this cache has made.
    #[must_use]
    pub fn store_lookups(&self) -> usize {
        self.store_lookups
    }
}

/// Parameter metadata taken from a variable's attributes.
#[must_use]
pub fn spec_for(variable: &dyn Variable, origin: &str) -> ParameterSpec {
    let attrs = variable.attributes();
    let text = |key: &str| attrs.text(key).map(str::to_string);
    ParameterSpec {
        name: variable.name().to_string(),
        units: text("units"),
        standard_name: text("standard_name"),
        long_name: text("long_name"),
        origin: Some(origin.to_string()),
    }
}
