use serde::Deserialize;

use crate::scenario::{Scenario, ScenarioStatus, ScenarioType};

/// Receives scenarios produced by a completed wizard.
pub trait ScenarioSink {
    fn complete(&mut self, scenario: Scenario);
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioFilter {
    #[serde(rename = "type")]
    pub scenario_type: Option<ScenarioType>,
    pub status: Option<ScenarioStatus>,
    pub search: Option<String>,
}

impl ScenarioFilter {
    pub fn matches(&self, scenario: &Scenario) -> bool {
        if let Some(kind) = self.scenario_type {
            if scenario.scenario_type != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if scenario.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => scenario
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// In-memory scenario list, newest first.
#[derive(Debug, Clone, Default)]
pub struct ScenarioList {
    scenarios: Vec<Scenario>,
}

impl ScenarioList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scenario: Scenario) {
        self.scenarios.insert(0, scenario);
    }

    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Scenario> {
        let idx = self.scenarios.iter().position(|s| s.id == id)?;
        Some(self.scenarios.remove(idx))
    }

    pub fn list(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn filter(&self, filter: &ScenarioFilter) -> Vec<Scenario> {
        self.scenarios
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl ScenarioSink for ScenarioList {
    fn complete(&mut self, scenario: Scenario) {
        self.insert(scenario);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationResult;
    use crate::roi::LeverBudget;
    use crate::scenario::{Kpi, Projection, ScenarioAllocation, Timeframe};

    fn optimization(name: &str) -> Scenario {
        Scenario::new(
            name,
            Kpi::Revenue,
            Timeframe::Quarter,
            100,
            ScenarioAllocation::Channels(vec![AllocationResult {
                name: "TV".to_string(),
                size: 100,
                percentage: 100.0,
            }]),
            Projection::default(),
        )
    }

    fn simulation(name: &str) -> Scenario {
        Scenario::new(
            name,
            Kpi::Conversions,
            Timeframe::Year,
            100,
            ScenarioAllocation::Levers(vec![LeverBudget::new("TV", 100, 1.5)]),
            Projection::default(),
        )
    }

    #[test]
    fn newest_first_and_lookup() {
        let mut list = ScenarioList::new();
        list.complete(optimization("first"));
        list.complete(simulation("second"));
        assert_eq!(list.len(), 2);
        assert_eq!(list.list()[0].name, "second");

        let id = list.list()[1].id.clone();
        assert_eq!(list.get(&id).map(|s| s.name.as_str()), Some("first"));
        assert!(list.remove(&id).is_some());
        assert!(list.get(&id).is_none());
    }

    #[test]
    fn filters_by_type_status_and_name() {
        let mut list = ScenarioList::new();
        list.complete(optimization("Holiday push"));
        list.complete(simulation("Holiday what-if"));
        list.complete(simulation("Spring test"));

        let sims = list.filter(&ScenarioFilter {
            scenario_type: Some(ScenarioType::Simulation),
            ..Default::default()
        });
        assert_eq!(sims.len(), 2);

        let holiday_sims = list.filter(&ScenarioFilter {
            scenario_type: Some(ScenarioType::Simulation),
            search: Some("  HOLIDAY ".to_string()),
            ..Default::default()
        });
        assert_eq!(holiday_sims.len(), 1);
        assert_eq!(holiday_sims[0].name, "Holiday what-if");

        let drafts = list.filter(&ScenarioFilter {
            status: Some(ScenarioStatus::Draft),
            ..Default::default()
        });
        assert!(drafts.is_empty());
    }
}
