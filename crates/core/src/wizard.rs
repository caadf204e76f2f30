//! Studio wizard step rules.
//!
//! The try-on wizard is a four-step flow: garment, model, style and
//! instructions, execute. Forward progression is linear and gated on the
//! required selection for each step; backward navigation is free. These
//! rules are pure; the session-scoped draft persistence lives in
//! `espelho-studio`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::style::Style;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The four steps of the studio wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectGarment,
    SelectModel,
    StyleAndInstructions,
    Execute,
}

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 4;

impl WizardStep {
    /// Convert a 1-based step number to a `WizardStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::SelectGarment),
            2 => Ok(Self::SelectModel),
            3 => Ok(Self::StyleAndInstructions),
            4 => Ok(Self::Execute),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::SelectGarment => 1,
            Self::SelectModel => 2,
            Self::StyleAndInstructions => 3,
            Self::Execute => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// In-progress wizard selections, persisted per browsing session so a reload
/// restores the user to the furthest valid step. Style rides along but is
/// optional all the way to execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardDraft {
    pub garment_asset_id: Option<DbId>,
    pub model_asset_id: Option<DbId>,
    #[serde(default)]
    pub instructions: String,
    pub style: Option<Style>,
    /// The step the user was last on (1-based).
    pub current_step: u8,
}

impl WizardDraft {
    pub fn new() -> Self {
        Self {
            current_step: MIN_STEP,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Check whether a step's entry requirements are satisfied by the draft.
///
/// - Step 2 requires a garment.
/// - Step 3 requires a model (and, transitively, a garment from a resumed
///   partial session).
/// - Step 4 requires both selections; style and instructions are optional.
pub fn can_enter(step: WizardStep, draft: &WizardDraft) -> bool {
    match step {
        WizardStep::SelectGarment => true,
        WizardStep::SelectModel => draft.garment_asset_id.is_some(),
        WizardStep::StyleAndInstructions => {
            draft.garment_asset_id.is_some() && draft.model_asset_id.is_some()
        }
        WizardStep::Execute => {
            draft.garment_asset_id.is_some() && draft.model_asset_id.is_some()
        }
    }
}

/// Validate a navigation request from `current` to `target`.
///
/// Backward moves are always free. Forward moves require the target step's
/// entry requirements to hold.
pub fn validate_navigation(
    current: WizardStep,
    target: WizardStep,
    draft: &WizardDraft,
) -> Result<(), CoreError> {
    if target <= current {
        return Ok(());
    }
    if can_enter(target, draft) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot advance to step {}: required selection is missing",
            target.to_number()
        )))
    }
}

/// The furthest step the draft's selections allow entering. Used to restore
/// the user after a reload.
pub fn furthest_valid_step(draft: &WizardDraft) -> WizardStep {
    if draft.garment_asset_id.is_some() && draft.model_asset_id.is_some() {
        // Landing directly on step 3 after a resumed partial session is
        // expected; Execute itself requires an explicit user action.
        WizardStep::StyleAndInstructions
    } else if draft.garment_asset_id.is_some() {
        WizardStep::SelectModel
    } else {
        WizardStep::SelectGarment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(garment: Option<DbId>, model: Option<DbId>) -> WizardDraft {
        WizardDraft {
            garment_asset_id: garment,
            model_asset_id: model,
            instructions: String::new(),
            style: None,
            current_step: 1,
        }
    }

    // -- Step numbers --

    #[test]
    fn step_number_roundtrip() {
        for n in MIN_STEP..=MAX_STEP {
            assert_eq!(WizardStep::from_number(n).unwrap().to_number(), n);
        }
    }

    #[test]
    fn step_number_out_of_range() {
        assert!(WizardStep::from_number(0).is_err());
        assert!(WizardStep::from_number(5).is_err());
    }

    // -- Entry requirements --

    #[test]
    fn step_two_requires_garment() {
        assert!(!can_enter(WizardStep::SelectModel, &draft(None, None)));
        assert!(can_enter(WizardStep::SelectModel, &draft(Some(1), None)));
    }

    #[test]
    fn step_three_requires_both_selections() {
        assert!(!can_enter(WizardStep::StyleAndInstructions, &draft(Some(1), None)));
        assert!(can_enter(WizardStep::StyleAndInstructions, &draft(Some(1), Some(2))));
    }

    #[test]
    fn execute_requires_both_selections_only() {
        // Style and instructions are optional/defaulted.
        assert!(can_enter(WizardStep::Execute, &draft(Some(1), Some(2))));
        assert!(!can_enter(WizardStep::Execute, &draft(None, Some(2))));
    }

    // -- Navigation --

    #[test]
    fn backward_navigation_is_free() {
        let d = draft(None, None);
        assert!(validate_navigation(WizardStep::Execute, WizardStep::SelectGarment, &d).is_ok());
        assert!(
            validate_navigation(WizardStep::StyleAndInstructions, WizardStep::SelectModel, &d)
                .is_ok()
        );
    }

    #[test]
    fn forward_navigation_gated_on_selections() {
        let empty = draft(None, None);
        assert!(
            validate_navigation(WizardStep::SelectGarment, WizardStep::SelectModel, &empty)
                .is_err()
        );

        let ready = draft(Some(1), Some(2));
        assert!(
            validate_navigation(WizardStep::StyleAndInstructions, WizardStep::Execute, &ready)
                .is_ok()
        );
    }

    #[test]
    fn forward_skip_allowed_when_requirements_hold() {
        // A resumed session with both assets selected may land on step 3.
        let ready = draft(Some(1), Some(2));
        assert!(validate_navigation(
            WizardStep::SelectGarment,
            WizardStep::StyleAndInstructions,
            &ready
        )
        .is_ok());
    }

    // -- Resume --

    #[test]
    fn resume_lands_on_furthest_valid_step() {
        assert_eq!(furthest_valid_step(&draft(None, None)), WizardStep::SelectGarment);
        assert_eq!(furthest_valid_step(&draft(Some(1), None)), WizardStep::SelectModel);
        assert_eq!(
            furthest_valid_step(&draft(Some(1), Some(2))),
            WizardStep::StyleAndInstructions
        );
    }
}
