//! Per-section state machine
//!
//! ```text
//! pending ──► generating ──► generated ──► validated
//!    ▲            │              │             │
//!    │            ▼              ▼             ▼
//!    └──────── failed ◄──────────┴── (regenerate) ──► generating
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::SectionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionState {
    #[default]
    Pending,
    Generating,
    Generated,
    Validated,
    Failed,
}

impl SectionState {
    /// Dependents may start once a section is generated or validated
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Generated | Self::Validated)
    }

    pub fn can_transition_to(&self, next: SectionState) -> bool {
        use SectionState::*;
        matches!(
            (self, next),
            (Pending | Failed | Generated | Validated, Generating)
                | (Generating, Generated | Failed)
                | (Generated, Validated)
        )
    }
}

impl fmt::Display for SectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Generating => write!(f, "generating"),
            Self::Generated => write!(f, "generated"),
            Self::Validated => write!(f, "validated"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatus {
    pub state: SectionState,
    /// Attempt number of the latest stored artifact, 0 when none
    pub attempt: u32,
    /// An upstream section was regenerated after this one
    pub stale: bool,
    pub last_error: Option<String>,
}

/// Status of every section of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    pub sections: BTreeMap<SectionKind, SectionStatus>,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            sections: SectionKind::ALL
                .iter()
                .map(|kind| (*kind, SectionStatus::default()))
                .collect(),
        }
    }
}

impl DocumentState {
    pub fn status(&self, section: SectionKind) -> SectionStatus {
        self.sections.get(&section).cloned().unwrap_or_default()
    }

    pub fn state(&self, section: SectionKind) -> SectionState {
        self.sections
            .get(&section)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    pub fn status_mut(&mut self, section: SectionKind) -> &mut SectionStatus {
        self.sections.entry(section).or_default()
    }

    /// Dependencies of `section` that are not ready yet
    pub fn missing_dependencies(&self, section: SectionKind) -> Vec<SectionKind> {
        section
            .dependencies()
            .iter()
            .copied()
            .filter(|dep| !self.state(*dep).is_ready())
            .collect()
    }

    /// Apply a transition, returning false (and leaving the state alone) when
    /// the move is not allowed
    pub fn transition(&mut self, section: SectionKind, next: SectionState) -> bool {
        let status = self.status_mut(section);
        if !status.state.can_transition_to(next) {
            return false;
        }
        status.state = next;
        true
    }

    pub fn stale_sections(&self) -> Vec<SectionKind> {
        self.sections
            .iter()
            .filter(|(_, s)| s.stale)
            .map(|(k, _)| *k)
            .collect()
    }
}
