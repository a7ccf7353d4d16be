//! Harness configuration file
//!
//! ```toml
//! [logging]
//! default_level = "debug"
//!
//! [[controllers]]
//! label = "c0"
//! port = 6633
//! cmdline = "./pox.py openflow.of_01 --address=__address__ --port=__port__"
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use sts_core::ControllerConfig;
use sts_logging::LogConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub logging: LogConfig,
    pub controllers: Vec<ControllerConfig>,
}

impl HarnessConfig {
    /// Read and validate a TOML configuration file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Every command line must expand, and labels must be unique
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut labels = HashSet::new();
        for controller in &self.controllers {
            controller.expanded_cmdline()?;
            let label = controller.label();
            if !labels.insert(label.clone()) {
                bail!("duplicate controller label {label}");
            }
        }
        Ok(())
    }
}
