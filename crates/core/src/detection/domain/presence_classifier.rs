use std::fmt;

use crate::shared::detection_box::{DetectionBox, DetectionResult};

/// True iff the result carries at least one person box.
///
/// An absent or empty box collection means "no detection", not an error.
pub fn detect_person(result: &DetectionResult) -> bool {
    result
        .boxes()
        .is_some_and(|boxes| boxes.iter().any(DetectionBox::is_person))
}

/// Combined presence over both cameras for one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceStatus {
    HumanAvailable,
    NoHuman,
}

impl PresenceStatus {
    /// Both cameras must see a person.
    pub fn combine(person_left: bool, person_right: bool) -> Self {
        if person_left && person_right {
            PresenceStatus::HumanAvailable
        } else {
            PresenceStatus::NoHuman
        }
    }

    pub fn from_results(left: &DetectionResult, right: &DetectionResult) -> Self {
        Self::combine(detect_person(left), detect_person(right))
    }

    pub fn label(self) -> &'static str {
        match self {
            PresenceStatus::HumanAvailable => "HUMAN AVAILABLE",
            PresenceStatus::NoHuman => "NO HUMAN",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
