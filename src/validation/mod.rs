//! Content validation
//!
//! - `grounding`: editor output against the facts offered to it
//! - `practice`: structural requirements of the practice section
//! - `quality`: document-level report over all sections
//! - `terminology`: glossary normalization and synonym-group checks
//!
//! Validators are built once from configuration and hold no mutable state.

mod grounding;
mod practice;
mod quality;
mod terminology;

pub use grounding::{EditorOutput, EnforcementLevel, GroundingViolation, ensure_grounded, validate_grounding};
pub use practice::{
    CheckOutcome, MatchSpan, PracticeCheck, PracticeRule, PracticeRules, PracticeValidation,
};
pub use quality::{
    LengthStatus, PlaceholderReason, QualityReport, QualityReporter, QualitySection,
    QualityWarning, RepeatedPhrase, SectionMetrics,
};
pub use terminology::{
    Glossary, TermLocation, TermReplacement, TerminologyConfig, TerminologyIssue,
};
