use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::allocation::bounds::{bounds_violations, BoundViolation};
use crate::allocation::{allocate, parse_budget, AllocationResult, ChannelConstraint, FactorSource};
use crate::config::Config;
use crate::scenario::{
    project_channels, ChannelProjection, Kpi, Projection, Scenario, ScenarioAllocation,
    ScenarioSink, Timeframe,
};
use crate::wizard::{advance, require_name, retreat, WizardError, WizardStep};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStep {
    Setup,
    Constraints,
}

impl WizardStep for OptimizationStep {
    const ORDER: &'static [Self] = &[Self::Setup, Self::Constraints];

    fn label(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Constraints => "constraints",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationDraft {
    pub name: String,
    pub kpi: Kpi,
    pub timeframe: Timeframe,
    pub total_budget: Option<u64>,
    pub channels: Vec<ChannelConstraint>,
    #[serde(default)]
    pub base_rois: BTreeMap<String, f64>,
    pub default_roi: f64,
}

impl OptimizationDraft {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: String::new(),
            kpi: config.planner.kpi,
            timeframe: config.planner.timeframe,
            total_budget: Some(config.planner.total_budget),
            channels: config.channel_constraints(),
            base_rois: config.channel_rois(),
            default_roi: config.planner.default_channel_roi,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub allocations: Vec<AllocationResult>,
    pub channels: Vec<ChannelProjection>,
    pub projection: Projection,
    pub violations: Vec<BoundViolation>,
}

/// Two-step wizard: scenario setup, then channel constraints.
#[derive(Debug, Clone)]
pub struct OptimizationWizard {
    step: OptimizationStep,
    draft: OptimizationDraft,
}

impl OptimizationWizard {
    pub fn new(draft: OptimizationDraft) -> Self {
        Self {
            step: OptimizationStep::Setup,
            draft,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(OptimizationDraft::from_config(config))
    }

    pub fn step(&self) -> OptimizationStep {
        self.step
    }

    pub fn draft(&self) -> &OptimizationDraft {
        &self.draft
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

    pub fn set_total_budget(&mut self, total_budget: u64) {
        self.draft.total_budget = Some(total_budget);
    }

    /// Parses free-form budget input. The draft is left untouched on error.
    pub fn set_total_budget_input(&mut self, raw: &str) -> Result<u64, WizardError> {
        let total_budget = parse_budget(raw)?;
        self.draft.total_budget = Some(total_budget);
        Ok(total_budget)
    }

    pub fn set_frozen(&mut self, channel: &str, frozen: bool) -> Result<(), WizardError> {
        self.channel_mut(channel)?.frozen = frozen;
        Ok(())
    }

    pub fn set_bounds(
        &mut self,
        channel: &str,
        min_percent: f64,
        max_percent: f64,
    ) -> Result<(), WizardError> {
        let target = self.channel_mut(channel)?;
        let mut updated = target.clone();
        updated.min_percent = min_percent;
        updated.max_percent = max_percent;
        updated.validate()?;
        *target = updated;
        Ok(())
    }

    pub fn set_current_budget(&mut self, channel: &str, amount: u64) -> Result<(), WizardError> {
        self.channel_mut(channel)?.current_budget = amount;
        Ok(())
    }

    pub fn set_base_roi(&mut self, channel: &str, roi: f64) -> Result<(), WizardError> {
        let name = self.channel_mut(channel)?.name.clone();
        self.draft.base_rois.insert(name, roi);
        Ok(())
    }

    pub fn next(&mut self) -> Result<OptimizationStep, WizardError> {
        self.validate_step(self.step)?;
        self.step = advance(self.step)?;
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<OptimizationStep, WizardError> {
        self.step = retreat(self.step)?;
        Ok(self.step)
    }

    /// Runs the allocation for the current draft without finishing the wizard.
    pub fn preview<F>(&self, factors: &mut F) -> Result<OptimizationOutcome, WizardError>
    where
        F: FactorSource + ?Sized,
    {
        let total_budget = self
            .draft
            .total_budget
            .ok_or(WizardError::MissingField("total_budget"))?;
        let allocations = allocate(total_budget, &self.draft.channels, factors)?;
        let (projection, channels) = project_channels(
            &allocations,
            &self.draft.channels,
            &self.draft.base_rois,
            self.draft.default_roi,
        );
        let violations = bounds_violations(&allocations, &self.draft.channels);
        Ok(OptimizationOutcome {
            allocations,
            channels,
            projection,
            violations,
        })
    }

    /// Allocates the budget, builds the scenario and hands it to `sink`.
    pub fn submit<F, S>(self, factors: &mut F, sink: &mut S) -> Result<Scenario, WizardError>
    where
        F: FactorSource + ?Sized,
        S: ScenarioSink + ?Sized,
    {
        if !self.step.is_final() {
            return Err(WizardError::NotAtFinalStep(self.step.label()));
        }
        self.validate_all()?;
        let outcome = self.preview(factors)?;
        let total_budget = outcome.allocations.iter().map(|a| a.size).sum();
        let scenario = Scenario::new(
            self.draft.name.trim(),
            self.draft.kpi,
            self.draft.timeframe,
            total_budget,
            ScenarioAllocation::Channels(outcome.allocations),
            outcome.projection,
        );
        info!(
            id = %scenario.id,
            name = %scenario.name,
            roi = scenario.roi,
            "optimization scenario completed"
        );
        sink.complete(scenario.clone());
        Ok(scenario)
    }

    /// Abandons the wizard, returning the discarded draft.
    pub fn close(self) -> OptimizationDraft {
        self.draft
    }

    /// Setters stay open on later steps, so submission rechecks every step.
    fn validate_all(&self) -> Result<(), WizardError> {
        OptimizationStep::ORDER
            .iter()
            .try_for_each(|&step| self.validate_step(step))
    }

    fn validate_step(&self, step: OptimizationStep) -> Result<(), WizardError> {
        match step {
            OptimizationStep::Setup => {
                require_name(&self.draft.name)?;
                match self.draft.total_budget {
                    Some(0) => Err(WizardError::InvalidBudget(
                        "total budget must be greater than zero".to_string(),
                    )),
                    Some(_) => Ok(()),
                    None => Err(WizardError::MissingField("total_budget")),
                }
            }
            OptimizationStep::Constraints => {
                if self.draft.channels.is_empty() {
                    return Err(WizardError::MissingField("channels"));
                }
                for channel in &self.draft.channels {
                    channel.validate()?;
                }
                Ok(())
            }
        }
    }

    fn channel_mut(&mut self, name: &str) -> Result<&mut ChannelConstraint, WizardError> {
        self.draft
            .channels
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| WizardError::UnknownChannel(name.to_string()))
    }
}
