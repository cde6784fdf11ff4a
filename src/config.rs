use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{Error, ViewchainResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub assignment: AssignmentPolicy,

    #[serde(default)]
    pub duplicate_registration: DuplicatePolicy,

    /// Seed for the shuffle RNG. `None` seeds from entropy.
    #[serde(default = "default_shuffle_seed")]
    pub shuffle_seed: Option<u64>,
}

/// What `set` does when no scope in the chain binds the name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentPolicy {
    /// Fail with `UnknownIdentifier`.
    #[default]
    Strict,
    /// Define the name in the scope the assignment was issued on.
    DefineLocal,
}

/// What registration does when a handler name is already taken.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Replace,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assignment: AssignmentPolicy::default(),
            duplicate_registration: DuplicatePolicy::default(),
            shuffle_seed: default_shuffle_seed(),
        }
    }
}

impl EngineConfig {
    // Load from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ViewchainResult<Self> {
        from_file(path)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ViewchainResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ViewchainResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_shuffle_seed() -> Option<u64> {
    None
}
