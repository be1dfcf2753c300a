//=====================================================
// File: config.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Profiler settings loaded from TOML
// Objective: Defaults for every knob, file loading with context on failure
//=====================================================

//! Configuration handling for the profiler, including loading and defaults.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::eligibility::DEFAULT_DENY_NAMESPACES;
use crate::metrics::ReportOptions;
use crate::registry::DEFAULT_MAX_SLOTS;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Master switch for the plugin hosting the profiler.
    pub enabled: bool,
    /// Verbose logging.
    pub debug: bool,
    /// Instrument eligible methods at startup.
    pub enable_profiling: bool,
    /// Capacity of the metrics store.
    pub max_slots: usize,
    /// Module whose methods are candidates for instrumentation.
    pub target_module: String,
    pub deny_namespaces: Vec<String>,
    /// Full type names; subtypes are denied too.
    pub deny_types: Vec<String>,
    pub report: ReportOptions,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            enable_profiling: true,
            max_slots: DEFAULT_MAX_SLOTS,
            target_module: "Assembly-CSharp".to_string(),
            deny_namespaces: DEFAULT_DENY_NAMESPACES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            deny_types: Vec::new(),
            report: ReportOptions::default(),
        }
    }
}

impl ProfilerConfig {
    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("parsing configuration {}", path.display()))
    }

    pub fn from_toml_str(data: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(data)?;
        if config.max_slots == 0 {
            anyhow::bail!("max_slots must be at least 1");
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        Ok(())
    }
}


//=====================================================
// End of file
//=====================================================
