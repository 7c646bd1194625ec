mod state;

pub use state::Aggregator;

use std::collections::BTreeMap;

use crate::error::Error;
use crate::value::Value;

/// Per-group aggregator slots, keyed by the canonicalized `GROUP BY` value.
/// A `BTreeMap` keeps groups in lexicographic key order for free, matching
/// the emission order `AggregateWriter` requires on `finish`.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    templates: Vec<Aggregator>,
    groups: BTreeMap<String, Vec<Aggregator>>,
}

impl GroupRegistry {
    /// `templates` is one aggregator "shape" per output column, assigned on
    /// the first aggregated row and immutable thereafter.
    pub fn new(templates: Vec<Aggregator>) -> Self {
        GroupRegistry {
            templates,
            groups: BTreeMap::new(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.templates.len()
    }

    /// Folds one row's per-column values into the group named by
    /// `group_key`, creating fresh aggregator state on first sight of the
    /// key.
    pub fn increment(&mut self, group_key: &str, values: Vec<Value>) -> Result<(), Error> {
        if values.len() != self.templates.len() {
            return Err(Error::unexpected(format!(
                "Expected {} aggregated output values, got {}",
                self.templates.len(),
                values.len()
            )));
        }
        let slots = self
            .groups
            .entry(group_key.to_string())
            .or_insert_with(|| self.templates.iter().map(Aggregator::new_instance).collect());
        for (idx, (slot, value)) in slots.iter_mut().zip(values.into_iter()).enumerate() {
            slot.increment(value, idx + 1)?;
        }
        Ok(())
    }

    /// Emits `[agg[0].get_final(), agg[1].get_final(), ...]` per group, in
    /// ascending group-key order.
    pub fn finalize(self) -> Vec<Vec<Value>> {
        self.groups
            .into_values()
            .map(|slots| slots.iter().map(Aggregator::get_final).collect())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
