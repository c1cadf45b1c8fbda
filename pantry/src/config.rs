//! Processor configuration

use pantry_core::PantryError;
use serde::{Deserialize, Serialize};
use std::env;

const CANCEL_CHECK_INTERVAL_VAR: &str = "PANTRY_CANCEL_CHECK_INTERVAL";
const PROGRESS_STEP_VAR: &str = "PANTRY_PROGRESS_STEP";

/// Tuning knobs for a source processing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Records delivered between two cancellation checks
    pub cancel_check_interval: u32,
    /// Minimum increase, in percent, between two progress reports
    pub progress_step: u8,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            cancel_check_interval: 1,
            progress_step: 1,
        }
    }
}

impl ProcessorConfig {
    pub fn with_cancel_check_interval(mut self, records: u32) -> Self {
        self.cancel_check_interval = records;
        self
    }

    pub fn with_progress_step(mut self, percent: u8) -> Self {
        self.progress_step = percent;
        self
    }

    pub fn validate(&self) -> Result<(), PantryError> {
        if self.cancel_check_interval == 0 {
            return Err(PantryError::invalid_config("cancel_check_interval must be at least 1"));
        }
        if self.progress_step == 0 || self.progress_step > 100 {
            return Err(PantryError::invalid_config(format!(
                "progress_step must be within 1-100, got {}",
                self.progress_step
            )));
        }
        Ok(())
    }

    /// Defaults overridden by `PANTRY_*` environment variables
    pub fn from_env() -> Result<Self, PantryError> {
        let mut config = Self::default();
        if let Some(interval) = read_var(CANCEL_CHECK_INTERVAL_VAR)? {
            config.cancel_check_interval = interval;
        }
        if let Some(step) = read_var(PROGRESS_STEP_VAR)? {
            config.progress_step = step;
        }
        config.validate()?;
        Ok(config)
    }
}

fn read_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, PantryError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PantryError::invalid_config(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
