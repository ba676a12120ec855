use serde::{Deserialize, Serialize};
use tracing::info;

use crate::allocation::parse_amount;
use crate::config::Config;
use crate::roi::LeverBudget;
use crate::scenario::{
    project_levers, Kpi, Projection, Scenario, ScenarioAllocation, ScenarioSink, Timeframe,
};
use crate::wizard::{advance, require_name, retreat, WizardError, WizardStep};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStep {
    Basics,
    Levers,
    Budgets,
    Review,
}

impl WizardStep for SimulationStep {
    const ORDER: &'static [Self] = &[Self::Basics, Self::Levers, Self::Budgets, Self::Review];

    fn label(self) -> &'static str {
        match self {
            Self::Basics => "basics",
            Self::Levers => "levers",
            Self::Budgets => "budgets",
            Self::Review => "review",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDraft {
    pub name: String,
    pub kpi: Kpi,
    pub timeframe: Timeframe,
    /// Levers the user can pick from.
    pub catalog: Vec<LeverBudget>,
    /// Picked levers, in selection order.
    pub selected: Vec<LeverBudget>,
}

impl SimulationDraft {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: String::new(),
            kpi: config.planner.kpi,
            timeframe: config.planner.timeframe,
            catalog: config.lever_budgets(),
            selected: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationSummary {
    pub reference_budget: u64,
    pub simulated_budget: u64,
    pub budget_change_pct: f64,
    pub projection: Projection,
}

/// Four-step wizard: basics, lever selection, budget edits, review.
#[derive(Debug, Clone)]
pub struct SimulationWizard {
    step: SimulationStep,
    draft: SimulationDraft,
}

impl SimulationWizard {
    pub fn new(draft: SimulationDraft) -> Self {
        Self {
            step: SimulationStep::Basics,
            draft,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SimulationDraft::from_config(config))
    }

    pub fn step(&self) -> SimulationStep {
        self.step
    }

    pub fn draft(&self) -> &SimulationDraft {
        &self.draft
    }

    pub fn levers(&self) -> &[LeverBudget] {
        &self.draft.selected
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    pub fn set_kpi(&mut self, kpi: Kpi) {
        self.draft.kpi = kpi;
    }

    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.draft.timeframe = timeframe;
    }

    /// Adds a catalog lever to the selection. Selecting twice is a no-op.
    pub fn select_lever(&mut self, name: &str) -> Result<(), WizardError> {
        if self.selected_index(name).is_some() {
            return Ok(());
        }
        let lever = self
            .draft
            .catalog
            .iter()
            .find(|l| l.name().eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| WizardError::UnknownLever(name.to_string()))?;
        self.draft.selected.push(lever);
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.draft.selected = self.draft.catalog.clone();
    }

    pub fn deselect_lever(&mut self, name: &str) -> Result<(), WizardError> {
        let idx = self
            .selected_index(name)
            .ok_or_else(|| WizardError::UnknownLever(name.to_string()))?;
        self.draft.selected.remove(idx);
        Ok(())
    }

    /// Sets a selected lever's new budget; its ROI is recomputed.
    pub fn set_new_budget(&mut self, name: &str, amount: u64) -> Result<f64, WizardError> {
        let idx = self
            .selected_index(name)
            .ok_or_else(|| WizardError::UnknownLever(name.to_string()))?;
        let lever = &mut self.draft.selected[idx];
        lever.set_new_budget(amount);
        Ok(lever.roi())
    }

    pub fn set_new_budget_input(&mut self, name: &str, raw: &str) -> Result<f64, WizardError> {
        let amount = parse_amount(raw)?;
        self.set_new_budget(name, amount)
    }

    pub fn summary(&self) -> SimulationSummary {
        let reference_budget: u64 = self.draft.selected.iter().map(|l| l.ref_budget()).sum();
        let simulated_budget: u64 = self.draft.selected.iter().map(|l| l.new_budget()).sum();
        let budget_change_pct = if reference_budget == 0 {
            0.0
        } else {
            (simulated_budget as f64 - reference_budget as f64) / reference_budget as f64 * 100.0
        };
        SimulationSummary {
            reference_budget,
            simulated_budget,
            budget_change_pct,
            projection: project_levers(&self.draft.selected),
        }
    }

    pub fn next(&mut self) -> Result<SimulationStep, WizardError> {
        self.validate_step(self.step)?;
        self.step = advance(self.step)?;
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<SimulationStep, WizardError> {
        self.step = retreat(self.step)?;
        Ok(self.step)
    }

    pub fn submit<S>(self, sink: &mut S) -> Result<Scenario, WizardError>
    where
        S: ScenarioSink + ?Sized,
    {
        if !self.step.is_final() {
            return Err(WizardError::NotAtFinalStep(self.step.label()));
        }
        self.validate_all()?;
        let summary = self.summary();
        let scenario = Scenario::new(
            self.draft.name.trim(),
            self.draft.kpi,
            self.draft.timeframe,
            summary.simulated_budget,
            ScenarioAllocation::Levers(self.draft.selected),
            summary.projection,
        );
        info!(
            id = %scenario.id,
            name = %scenario.name,
            roi = scenario.roi,
            contribution = scenario.contribution,
            "simulation scenario completed"
        );
        sink.complete(scenario.clone());
        Ok(scenario)
    }

    pub fn close(self) -> SimulationDraft {
        self.draft
    }

    /// Setters stay open on later steps, so submission rechecks every step.
    fn validate_all(&self) -> Result<(), WizardError> {
        SimulationStep::ORDER
            .iter()
            .try_for_each(|&step| self.validate_step(step))
    }

    fn validate_step(&self, step: SimulationStep) -> Result<(), WizardError> {
        match step {
            SimulationStep::Basics => require_name(&self.draft.name),
            SimulationStep::Levers => {
                if self.draft.selected.is_empty() {
                    return Err(WizardError::MissingField("levers"));
                }
                Ok(())
            }
            SimulationStep::Budgets => {
                let total: u64 = self.draft.selected.iter().map(|l| l.new_budget()).sum();
                if total == 0 {
                    return Err(WizardError::InvalidBudget(
                        "simulated budget must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            SimulationStep::Review => Ok(()),
        }
    }

    fn selected_index(&self, name: &str) -> Option<usize> {
        self.draft
            .selected
            .iter()
            .position(|l| l.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioList, ScenarioType};

    fn wizard() -> SimulationWizard {
        SimulationWizard::from_config(&Config::default())
    }

    #[test]
    fn four_steps_each_validated() {
        let mut wizard = wizard();
        assert_eq!(wizard.next(), Err(WizardError::MissingField("name")));
        wizard.set_name("Shift to digital");
        assert_eq!(wizard.next(), Ok(SimulationStep::Levers));
        assert_eq!(wizard.next(), Err(WizardError::MissingField("levers")));

        wizard.select_lever("tv").expect("TV is in the catalog");
        assert_eq!(
            wizard.select_lever("Cinema"),
            Err(WizardError::UnknownLever("Cinema".to_string()))
        );
        assert_eq!(wizard.next(), Ok(SimulationStep::Budgets));

        wizard.set_new_budget("TV", 0).expect("TV selected");
        assert!(matches!(wizard.next(), Err(WizardError::InvalidBudget(_))));
        wizard.set_new_budget("TV", 60_000).expect("TV selected");
        assert_eq!(wizard.next(), Ok(SimulationStep::Review));
        assert_eq!(wizard.next(), Err(WizardError::AtFinalStep));

        assert_eq!(wizard.back(), Ok(SimulationStep::Budgets));
        assert_eq!(wizard.back(), Ok(SimulationStep::Levers));
        assert_eq!(wizard.back(), Ok(SimulationStep::Basics));
        assert_eq!(wizard.back(), Err(WizardError::AtFirstStep));
    }

    #[test]
    fn budget_edit_recomputes_roi() {
        let mut wizard = wizard();
        wizard.select_lever("TV").expect("TV is in the catalog");
        let roi = wizard
            .set_new_budget_input("TV", "180,000")
            .expect("valid input");
        assert!((roi - 3.99).abs() < 1e-9);
        assert_eq!(wizard.levers()[0].ref_budget(), 120_000);
        assert!(matches!(
            wizard.set_new_budget_input("TV", "soon"),
            Err(WizardError::Allocation(_))
        ));
        assert_eq!(
            wizard.set_new_budget("Radio", 1),
            Err(WizardError::UnknownLever("Radio".to_string()))
        );
    }

    #[test]
    fn submit_builds_simulation_scenario() {
        let mut wizard = wizard();
        wizard.set_name("Lean quarter");
        wizard.set_timeframe(Timeframe::Month);
        wizard.next().expect("basics");
        wizard.select_all();
        wizard.deselect_lever("Print").expect("Print selected");
        wizard.next().expect("levers");
        wizard.set_new_budget("Digital", 135_000).expect("Digital selected");
        wizard.next().expect("budgets");

        let summary = wizard.summary();
        assert_eq!(summary.reference_budget, 310_000);
        assert_eq!(summary.simulated_budget, 355_000);

        let mut list = ScenarioList::new();
        let scenario = wizard.submit(&mut list).expect("submit failed");
        assert_eq!(scenario.scenario_type, ScenarioType::Simulation);
        assert_eq!(scenario.timeframe, Timeframe::Month);
        assert_eq!(scenario.total_budget, 355_000);
        assert_eq!(scenario.roi, summary.projection.roi);
        let ScenarioAllocation::Levers(levers) = &scenario.allocation else {
            panic!("expected lever allocation");
        };
        assert_eq!(levers.len(), 4);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn submit_rechecks_earlier_steps_from_review() {
        let mut wizard = wizard();
        wizard.set_name("Radio push");
        wizard.next().expect("basics");
        wizard.select_lever("TV").expect("TV is in the catalog");
        wizard.next().expect("levers");
        wizard.next().expect("budgets");
        assert_eq!(wizard.step(), SimulationStep::Review);

        let mut blank_name = wizard.clone();
        blank_name.set_name("   ");
        let mut list = ScenarioList::new();
        assert_eq!(
            blank_name.submit(&mut list).unwrap_err(),
            WizardError::MissingField("name")
        );

        wizard.deselect_lever("TV").expect("TV selected");
        assert_eq!(
            wizard.submit(&mut list).unwrap_err(),
            WizardError::MissingField("levers")
        );
        assert!(list.is_empty());
    }

    #[test]
    fn closing_returns_draft() {
        let mut wizard = wizard();
        wizard.set_name("Scratch");
        let draft = wizard.close();
        assert_eq!(draft.name, "Scratch");
        assert!(draft.selected.is_empty());
    }
}
