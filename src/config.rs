use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::allocation::ChannelConstraint;
use crate::roi::LeverBudget;
use crate::scenario::{Kpi, Timeframe};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
    #[serde(default = "default_levers")]
    pub levers: Vec<LeverConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_total_budget")]
    pub total_budget: u64,
    #[serde(default)]
    pub kpi: Kpi,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default = "default_channel_roi")]
    pub default_channel_roi: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AllocationConfig {
    /// Fixed seed for the allocation factor draws; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default)]
    pub min_percent: f64,
    #[serde(default = "default_max_percent")]
    pub max_percent: f64,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub current_budget: u64,
    #[serde(default)]
    pub roi: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeverConfig {
    pub name: String,
    pub ref_budget: u64,
    pub roi: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub seed: Option<u64>,
    pub total_budget: Option<u64>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/budget-planner/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        Self::from_toml(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(seed) = overrides.seed {
            self.allocation.seed = Some(seed);
        }
        if let Some(total_budget) = overrides.total_budget {
            self.planner.total_budget = total_budget;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn channel_constraints(&self) -> Vec<ChannelConstraint> {
        self.channels
            .iter()
            .map(|c| ChannelConstraint {
                name: c.name.clone(),
                min_percent: c.min_percent,
                max_percent: c.max_percent,
                frozen: c.frozen,
                current_budget: c.current_budget,
            })
            .collect()
    }

    pub fn channel_rois(&self) -> BTreeMap<String, f64> {
        self.channels
            .iter()
            .filter_map(|c| c.roi.map(|roi| (c.name.clone(), roi)))
            .collect()
    }

    pub fn lever_budgets(&self) -> Vec<LeverBudget> {
        self.levers
            .iter()
            .map(|l| LeverBudget::new(l.name.clone(), l.ref_budget, l.roi))
            .collect()
    }

    pub fn default_template() -> String {
        let template = r#"[planner]
total_budget = 350000
kpi = "revenue"
timeframe = "quarter"
default_channel_roi = 3.0

[allocation]
# seed = 42

[server]
host = "127.0.0.1"
port = 3001

[[channels]]
name = "TV"
min_percent = 20.0
max_percent = 40.0
frozen = true
current_budget = 110000
roi = 4.2

[[channels]]
name = "Digital"
min_percent = 15.0
max_percent = 35.0
current_budget = 85000
roi = 5.1

[[channels]]
name = "Social"
min_percent = 10.0
max_percent = 25.0
current_budget = 65000
roi = 3.8

[[channels]]
name = "Print"
min_percent = 5.0
max_percent = 15.0
current_budget = 45000
roi = 2.1

[[channels]]
name = "Radio"
min_percent = 5.0
max_percent = 15.0
current_budget = 45000
roi = 2.6

[[levers]]
name = "TV"
ref_budget = 120000
roi = 4.2

[[levers]]
name = "Digital"
ref_budget = 90000
roi = 5.1

[[levers]]
name = "Social"
ref_budget = 60000
roi = 3.8

[[levers]]
name = "Print"
ref_budget = 40000
roi = 2.1

[[levers]]
name = "Radio"
ref_budget = 40000
roi = 2.6
"#;
        template.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            allocation: AllocationConfig::default(),
            server: ServerConfig::default(),
            channels: default_channels(),
            levers: default_levers(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            total_budget: default_total_budget(),
            kpi: Kpi::default(),
            timeframe: Timeframe::default(),
            default_channel_roi: default_channel_roi(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn channel(
    name: &str,
    min_percent: f64,
    max_percent: f64,
    frozen: bool,
    current_budget: u64,
    roi: f64,
) -> ChannelConfig {
    ChannelConfig {
        name: name.to_string(),
        min_percent,
        max_percent,
        frozen,
        current_budget,
        roi: Some(roi),
    }
}

fn lever(name: &str, ref_budget: u64, roi: f64) -> LeverConfig {
    LeverConfig {
        name: name.to_string(),
        ref_budget,
        roi,
    }
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        channel("TV", 20.0, 40.0, true, 110_000, 4.2),
        channel("Digital", 15.0, 35.0, false, 85_000, 5.1),
        channel("Social", 10.0, 25.0, false, 65_000, 3.8),
        channel("Print", 5.0, 15.0, false, 45_000, 2.1),
        channel("Radio", 5.0, 15.0, false, 45_000, 2.6),
    ]
}

fn default_levers() -> Vec<LeverConfig> {
    vec![
        lever("TV", 120_000, 4.2),
        lever("Digital", 90_000, 5.1),
        lever("Social", 60_000, 3.8),
        lever("Print", 40_000, 2.1),
        lever("Radio", 40_000, 2.6),
    ]
}

fn default_total_budget() -> u64 {
    350_000
}

fn default_channel_roi() -> f64 {
    3.0
}

fn default_max_percent() -> f64 {
    100.0
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_matches_defaults() {
        let parsed = Config::from_toml(&Config::default_template()).expect("template must parse");
        let defaults = Config::default();
        assert_eq!(parsed.planner.total_budget, defaults.planner.total_budget);
        assert_eq!(parsed.planner.kpi, defaults.planner.kpi);
        assert_eq!(parsed.planner.timeframe, defaults.planner.timeframe);
        assert_eq!(parsed.channels, defaults.channels);
        assert_eq!(parsed.levers, defaults.levers);
        assert_eq!(parsed.allocation.seed, None);
        assert_eq!(parsed.server.port, 3001);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let parsed = Config::from_toml("[planner]\ntimeframe = \"year\"\n").expect("parse failed");
        assert_eq!(parsed.planner.timeframe, Timeframe::Year);
        assert_eq!(parsed.planner.total_budget, 350_000);
        assert_eq!(parsed.channels.len(), 5);
        assert_eq!(parsed.levers.len(), 5);
    }

    #[test]
    fn overrides_replace_seed_and_budget() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            seed: Some(9),
            total_budget: Some(500_000),
        });
        assert_eq!(config.allocation.seed, Some(9));
        assert_eq!(config.planner.total_budget, 500_000);
        assert_eq!(config.channel_rois().get("Digital"), Some(&5.1));
        assert_eq!(config.lever_budgets()[0].ref_budget(), 120_000);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("budget-planner-does-not-exist/config.toml");
        let config = Config::load(Some(&path)).expect("load failed");
        assert_eq!(config.channels.len(), 5);
    }
}
