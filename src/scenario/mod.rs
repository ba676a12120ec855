pub mod projection;
pub mod store;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::allocation::AllocationResult;
use crate::roi::LeverBudget;

pub use projection::{project_channels, project_levers, ChannelProjection, Projection};
pub use store::{ScenarioFilter, ScenarioList, ScenarioSink};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub status: ScenarioStatus,
    pub roi: f64,
    pub contribution: f64,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    pub kpi: Kpi,
    pub total_budget: u64,
    #[serde(flatten)]
    pub allocation: ScenarioAllocation,
    pub timeframe: Timeframe,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        kpi: Kpi,
        timeframe: Timeframe,
        total_budget: u64,
        allocation: ScenarioAllocation,
        projection: Projection,
    ) -> Self {
        let scenario_type = match allocation {
            ScenarioAllocation::Channels(_) => ScenarioType::Optimization,
            ScenarioAllocation::Levers(_) => ScenarioType::Simulation,
        };
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            status: ScenarioStatus::Completed,
            roi: projection.roi,
            contribution: projection.contribution,
            date: Utc::now(),
            scenario_type,
            kpi,
            total_budget,
            allocation,
            timeframe,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioAllocation {
    Channels(Vec<AllocationResult>),
    Levers(Vec<LeverBudget>),
}

#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct ScenarioParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ScenarioParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    Optimization,
    Simulation,
}

impl Display for ScenarioType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimization => write!(f, "optimization"),
            Self::Simulation => write!(f, "simulation"),
        }
    }
}

impl FromStr for ScenarioType {
    type Err = ScenarioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimization" | "optimisation" | "optimize" => Ok(Self::Optimization),
            "simulation" | "simulate" => Ok(Self::Simulation),
            _ => Err(ScenarioParseError::new("scenario type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Draft,
    Running,
    Completed,
}

impl Display for ScenarioStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ScenarioStatus {
    type Err = ScenarioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "running" | "in_progress" | "in-progress" => Ok(Self::Running),
            "completed" | "complete" | "done" => Ok(Self::Completed),
            _ => Err(ScenarioParseError::new("scenario status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    #[default]
    Revenue,
    Conversions,
    BrandAwareness,
    CustomerAcquisition,
}

impl Display for Kpi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Revenue => write!(f, "revenue"),
            Self::Conversions => write!(f, "conversions"),
            Self::BrandAwareness => write!(f, "brand_awareness"),
            Self::CustomerAcquisition => write!(f, "customer_acquisition"),
        }
    }
}

impl FromStr for Kpi {
    type Err = ScenarioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "revenue" => Ok(Self::Revenue),
            "conversions" | "conversion" => Ok(Self::Conversions),
            "brand_awareness" | "awareness" => Ok(Self::BrandAwareness),
            "customer_acquisition" | "acquisition" | "cac" => Ok(Self::CustomerAcquisition),
            _ => Err(ScenarioParseError::new("kpi", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Month,
    #[default]
    Quarter,
    HalfYear,
    Year,
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Month => write!(f, "month"),
            Self::Quarter => write!(f, "quarter"),
            Self::HalfYear => write!(f, "half_year"),
            Self::Year => write!(f, "year"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = ScenarioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "month" | "monthly" | "1m" => Ok(Self::Month),
            "quarter" | "quarterly" | "3m" | "q" => Ok(Self::Quarter),
            "half_year" | "half" | "6m" => Ok(Self::HalfYear),
            "year" | "annual" | "yearly" | "12m" => Ok(Self::Year),
            _ => Err(ScenarioParseError::new("timeframe", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enum_aliases() {
        assert_eq!("Quarterly".parse::<Timeframe>().unwrap(), Timeframe::Quarter);
        assert_eq!("half-year".parse::<Timeframe>().unwrap(), Timeframe::HalfYear);
        assert_eq!("Brand Awareness".parse::<Kpi>().unwrap(), Kpi::BrandAwareness);
        assert_eq!(
            "in-progress".parse::<ScenarioStatus>().unwrap(),
            ScenarioStatus::Running
        );
        assert!("weekly".parse::<Timeframe>().is_err());
    }

    #[test]
    fn serializes_type_field_and_allocation_kind() {
        let scenario = Scenario::new(
            "Q3 rebalance",
            Kpi::Revenue,
            Timeframe::Quarter,
            1_000,
            ScenarioAllocation::Levers(vec![LeverBudget::new("TV", 1_000, 2.0)]),
            Projection {
                roi: 2.0,
                contribution: 0.0,
            },
        );
        let value = serde_json::to_value(&scenario).expect("serialize failed");
        assert_eq!(value["type"], "simulation");
        assert_eq!(value["status"], "completed");
        assert!(value["levers"].is_array());
        assert!(value.get("channels").is_none());

        let back: Scenario = serde_json::from_value(value).expect("deserialize failed");
        assert_eq!(back, scenario);
    }
}
