use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrossMinOptions {
    /// Seed for tie-break perturbation, random fill-in and randomized first layers.
    pub random_seed: u64,
    /// Number of independently randomized runs; the best one wins. `0` behaves like `1`.
    pub thoroughness: usize,
    /// Upper bound on alternating sweeps inside one run.
    pub max_sweeps_per_run: usize,
    /// Add the estimate for in-layer edges to the bilayer crossing count.
    pub count_in_layer_crossings: bool,
}

impl Default for CrossMinOptions {
    fn default() -> Self {
        Self {
            random_seed: 1,
            thoroughness: 7,
            max_sweeps_per_run: 64,
            count_in_layer_crossings: true,
        }
    }
}

impl CrossMinOptions {
    /// Parses a (possibly partial) JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: CrossMinOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_sweeps_per_run == 0 {
            return Err(Error::InvalidOptions {
                message: "maxSweepsPerRun must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn runs(&self) -> usize {
        self.thoroughness.max(1)
    }
}
