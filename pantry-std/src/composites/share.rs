//! Key share, derived from a key histogram

use crate::names::outputs;
use pantry_plugin::prelude::*;
use std::collections::BTreeMap;

pub static SHARE_OUTPUTS: [OutputMeta; 2] = [
    OutputMeta::new(outputs::SHARES, "Object", "Fraction of records per key"),
    OutputMeta::new(outputs::DOMINANT_KEY, "Text?", "Key with the most records"),
];

/// Turns a histogram's counts into fractions of the total
pub struct KeyShare {
    path: CookerPath,
    dependencies: [CookerPath; 1],
    shares: BTreeMap<String, Value>,
    dominant: Option<String>,
}

impl KeyShare {
    /// `histogram` must expose a `histogram` output of per-key counts
    pub fn new(path: CookerPath, histogram: CookerPath) -> Self {
        Self {
            path,
            dependencies: [histogram],
            shares: BTreeMap::new(),
            dominant: None,
        }
    }
}

impl CompositeCooker for KeyShare {
    fn path(&self) -> &CookerPath {
        &self.path
    }

    fn dependencies(&self) -> &[CookerPath] {
        &self.dependencies
    }

    fn derive(&mut self, inputs: &DataRetrieval<'_>) -> Result<(), PantryError> {
        let source = self.dependencies[0].output(outputs::HISTOGRAM)?;
        let counts: BTreeMap<String, Value> = inputs.query_output(&source)?;

        let mut total = 0i64;
        let mut best: Option<(&String, i64)> = None;
        for (key, value) in &counts {
            let count = value.as_int().ok_or_else(|| {
                PantryError::new(
                    codes::TYPE_MISMATCH,
                    format!("count of key '{}' is {}, expected Int", key, value.type_name()),
                )
                .in_cooker(&self.path)
            })?;
            total += count;
            // Ties keep the smallest key
            if best.map_or(true, |(_, max)| count > max) {
                best = Some((key, count));
            }
        }

        self.dominant = best.filter(|(_, count)| *count > 0).map(|(key, _)| key.clone());
        self.shares = counts
            .iter()
            .filter_map(|(key, value)| {
                let count = value.as_int()?;
                (total > 0).then(|| (key.clone(), Value::Float(count as f64 / total as f64)))
            })
            .collect();
        Ok(())
    }

    fn output(&self, name: &str) -> Option<Value> {
        match name {
            outputs::SHARES => Some(Value::Object(self.shares.clone())),
            outputs::DOMINANT_KEY => Some(Value::from(self.dominant.clone())),
            _ => None,
        }
    }
}
