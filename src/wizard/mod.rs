pub mod optimization;
pub mod simulation;

use thiserror::Error;

use crate::allocation::AllocationError;

pub use optimization::{OptimizationDraft, OptimizationOutcome, OptimizationStep, OptimizationWizard};
pub use simulation::{SimulationDraft, SimulationStep, SimulationSummary, SimulationWizard};

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("already on the first step")]
    AtFirstStep,
    #[error("already on the final step")]
    AtFinalStep,
    #[error("cannot submit from step {0}, finish the wizard first")]
    NotAtFinalStep(&'static str),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("unknown lever: {0}")]
    UnknownLever(String),
    #[error("invalid budget: {0}")]
    InvalidBudget(String),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// A position in a linear wizard.
pub trait WizardStep: Copy + PartialEq + 'static {
    const ORDER: &'static [Self];

    fn label(self) -> &'static str;

    fn index(self) -> usize {
        Self::ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    fn is_first(self) -> bool {
        self.index() == 0
    }

    fn is_final(self) -> bool {
        self.index() + 1 == Self::ORDER.len()
    }
}

pub(crate) fn advance<S: WizardStep>(current: S) -> Result<S, WizardError> {
    S::ORDER
        .get(current.index() + 1)
        .copied()
        .ok_or(WizardError::AtFinalStep)
}

pub(crate) fn retreat<S: WizardStep>(current: S) -> Result<S, WizardError> {
    current
        .index()
        .checked_sub(1)
        .and_then(|idx| S::ORDER.get(idx).copied())
        .ok_or(WizardError::AtFirstStep)
}

pub(crate) fn require_name(name: &str) -> Result<(), WizardError> {
    if name.trim().is_empty() {
        return Err(WizardError::MissingField("name"));
    }
    Ok(())
}
