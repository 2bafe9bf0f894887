//! Three-step trip-request wizard ("simule seu roteiro").
//!
//! Step 1 collects destination and date, step 2 preferences and traveler
//! profile, step 3 the budget. Each forward move validates the fields of the
//! step being left; submitting returns the finished request and resets the
//! wizard.

use core::fmt;
use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{ExperienceKind, UnknownVariant, fold};

/// Errors raised while moving through the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripRequestError {
    /// A required field of the current step is blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// `submit` was called before reaching the budget step.
    #[error("cannot submit from step {0}")]
    NotOnFinalStep(u8),
}

/// Wizard position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Step {
    #[default]
    DestinationAndDate,
    Preferences,
    Budget,
}

impl Step {
    pub const COUNT: u8 = 3;

    /// One-based step number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::DestinationAndDate => 1,
            Self::Preferences => 2,
            Self::Budget => 3,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::DestinationAndDate => "Destino e Data",
            Self::Preferences => "Preferências",
            Self::Budget => "Orçamento",
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::DestinationAndDate => Self::Preferences,
            Self::Preferences | Self::Budget => Self::Budget,
        }
    }

    const fn prev(self) -> Self {
        match self {
            Self::DestinationAndDate | Self::Preferences => Self::DestinationAndDate,
            Self::Budget => Self::Preferences,
        }
    }
}

/// Who is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelerProfile {
    Family,
    Couple,
    Solo,
    Adventure,
}

impl TravelerProfile {
    pub const ALL: [Self; 4] = [Self::Family, Self::Couple, Self::Solo, Self::Adventure];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Family => "Família",
            Self::Couple => "Casal",
            Self::Solo => "Solo",
            Self::Adventure => "Aventura",
        }
    }
}

impl fmt::Display for TravelerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TravelerProfile {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s.trim());
        Self::ALL
            .into_iter()
            .find(|p| fold(p.label()) == folded)
            .ok_or_else(|| UnknownVariant::new("traveler profile", s))
    }
}

/// A completed trip request, ready to hand to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    pub date: NaiveDate,
    pub preferences: BTreeSet<ExperienceKind>,
    pub traveler_profile: TravelerProfile,
    /// Free text, e.g. "R$ 5000 por pessoa".
    pub budget: String,
}

/// Mutable wizard state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripRequestWizard {
    step: Step,
    pub destination: String,
    pub date: Option<NaiveDate>,
    preferences: BTreeSet<ExperienceKind>,
    pub traveler_profile: Option<TravelerProfile>,
    pub budget: String,
}

impl TripRequestWizard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub const fn preferences(&self) -> &BTreeSet<ExperienceKind> {
        &self.preferences
    }

    /// Check or uncheck a preference.
    pub fn set_preference(&mut self, kind: ExperienceKind, checked: bool) {
        if checked {
            self.preferences.insert(kind);
        } else {
            self.preferences.remove(&kind);
        }
    }

    /// Flip a preference; returns whether it is now checked.
    pub fn toggle_preference(&mut self, kind: ExperienceKind) -> bool {
        let checked = !self.preferences.contains(&kind);
        self.set_preference(kind, checked);
        checked
    }

    /// Progress bar fill, 33/66/100.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        self.step.number() * 100 / Step::COUNT
    }

    /// Validate the current step and move forward. Stays on the last step.
    ///
    /// # Errors
    ///
    /// Returns [`TripRequestError::MissingField`] naming the first blank
    /// required field of the current step.
    pub fn next(&mut self) -> Result<Step, TripRequestError> {
        self.validate_step()?;
        self.step = self.step.next();
        Ok(self.step)
    }

    /// Move back one step. Stays on the first step.
    pub fn back(&mut self) -> Step {
        self.step = self.step.prev();
        self.step
    }

    fn validate_step(&self) -> Result<(), TripRequestError> {
        match self.step {
            Step::DestinationAndDate => {
                if self.destination.trim().is_empty() {
                    return Err(TripRequestError::MissingField("destination"));
                }
                if self.date.is_none() {
                    return Err(TripRequestError::MissingField("date"));
                }
            }
            Step::Preferences => {
                if self.traveler_profile.is_none() {
                    return Err(TripRequestError::MissingField("traveler_profile"));
                }
            }
            Step::Budget => {
                if self.budget.trim().is_empty() {
                    return Err(TripRequestError::MissingField("budget"));
                }
            }
        }
        Ok(())
    }

    /// Finish the wizard. On success the wizard is reset to step 1.
    ///
    /// # Errors
    ///
    /// Returns [`TripRequestError::NotOnFinalStep`] before step 3, or
    /// [`TripRequestError::MissingField`] if any required field is blank.
    pub fn submit(&mut self) -> Result<TripRequest, TripRequestError> {
        if self.step != Step::Budget {
            return Err(TripRequestError::NotOnFinalStep(self.step.number()));
        }
        self.validate_step()?;

        let (Some(date), Some(traveler_profile)) = (self.date, self.traveler_profile) else {
            // Earlier steps were validated on the way here, but fields are
            // public and may have been cleared since.
            return Err(TripRequestError::MissingField(if self.date.is_none() {
                "date"
            } else {
                "traveler_profile"
            }));
        };
        if self.destination.trim().is_empty() {
            return Err(TripRequestError::MissingField("destination"));
        }

        let finished = std::mem::take(self);
        Ok(TripRequest {
            destination: finished.destination.trim().to_string(),
            date,
            preferences: finished.preferences,
            traveler_profile,
            budget: finished.budget.trim().to_string(),
        })
    }

    /// Human-readable summary shown beside the budget step.
    #[must_use]
    pub fn summary(&self) -> String {
        let or_blank = |s: &str| {
            if s.trim().is_empty() {
                "Not provided".to_string()
            } else {
                s.trim().to_string()
            }
        };
        let preferences = if self.preferences.is_empty() {
            "None".to_string()
        } else {
            self.preferences
                .iter()
                .map(|k| k.label())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Destination: {}\nDate: {}\nPreferences: {}\nBudget: {}",
            or_blank(&self.destination),
            self.date
                .map_or_else(|| "Not provided".to_string(), |d| d.to_string()),
            preferences,
            or_blank(&self.budget),
        )
    }
}
