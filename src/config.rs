//! Pipeline configuration
//!
//! Only randomness is configurable. A fixed `seed` makes setup and proving
//! reproducible (tests, demos); without one the RNG is drawn from OS entropy.
//!
//! Sources, lowest precedence first: [`Default`], a JSON file
//! ([`PipelineConfig::from_json_file`]), the environment
//! ([`PipelineConfig::from_env`], `SVK_SEED`).

#![forbid(unsafe_code)]

use std::{fs, path::Path};

use anyhow::Context;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Environment variable holding a decimal `u64` seed.
pub const SEED_ENV: &str = "SVK_SEED";

/// Settings shared by every pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Seed for setup and proving randomness.
    pub seed: Option<u64>,
}

impl PipelineConfig {
    /// Defaults overridden by `SVK_SEED` when it is set.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::default().with_env()
    }

    /// Parse a JSON file such as `{ "seed": 42 }`.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    /// Apply `SVK_SEED` on top of `self`.
    pub fn with_env(self) -> anyhow::Result<Self> {
        match std::env::var(SEED_ENV) {
            Ok(v) => self.with_seed_str(&v),
            Err(std::env::VarError::NotPresent) => Ok(self),
            Err(e) => Err(e).with_context(|| format!("read {SEED_ENV}")),
        }
    }

    fn with_seed_str(mut self, raw: &str) -> anyhow::Result<Self> {
        let seed = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{SEED_ENV}={raw:?} is not a u64"))?;
        self.seed = Some(seed);
        Ok(self)
    }

    /// Seeded RNG when `seed` is set, otherwise one drawn from OS entropy.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
