//! Grounding checks for editor output
//!
//! L1 accepts any edit. L2 and L3 require the editor to declare which facts it
//! relied on, and every declared fact must have been offered to it. L3 asks
//! for better prose through its prompt only; the check here is the same as L2.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{FactKey, FactweaveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnforcementLevel {
    #[default]
    #[serde(alias = "l1")]
    L1,
    #[serde(alias = "l2")]
    L2,
    #[serde(alias = "l3")]
    L3,
}

impl EnforcementLevel {
    pub fn requires_grounding(&self) -> bool {
        !matches!(self, Self::L1)
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L3 => write!(f, "L3"),
        }
    }
}

impl std::str::FromStr for EnforcementLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            "L3" => Ok(Self::L3),
            _ => Err(format!("Unknown enforcement level: {}. Valid values: L1, L2, L3", s)),
        }
    }
}

/// Structured answer of an edit call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorOutput {
    pub edited_text: String,
    #[serde(default)]
    pub facts_used: Vec<FactKey>,
    #[serde(default)]
    pub changes_made: Vec<String>,
    /// As reported; see `clamped_confidence`
    #[serde(default)]
    pub confidence: f64,
}

impl EditorOutput {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn clamped_confidence(&self) -> f64 {
        self.confidence.clamp(0.0, 1.0)
    }

    /// JSON schema handed to the generation collaborator for edit calls
    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["edited_text", "facts_used", "changes_made", "confidence"],
            "properties": {
                "edited_text": { "type": "string" },
                "facts_used": { "type": "array", "items": { "type": "string" } },
                "changes_made": { "type": "array", "items": { "type": "string" } },
                "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroundingViolation {
    /// No facts declared at a level that requires them
    EmptyFactsUsed,
    /// Declared fact that was not offered for the section
    UnknownFact { key: FactKey },
    ConfidenceOutOfRange { value: f64 },
}

impl fmt::Display for GroundingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFactsUsed => write!(f, "facts_used is empty"),
            Self::UnknownFact { key } => write!(f, "fact '{}' was not offered", key),
            Self::ConfidenceOutOfRange { value } => {
                write!(f, "confidence {} is outside [0, 1]", value)
            }
        }
    }
}

/// Every violation of `output` against the offered fact keys.
///
/// Pure: nothing is stored or logged. An empty list means the output is
/// accepted at `level`.
pub fn validate_grounding(
    output: &EditorOutput,
    offered: &BTreeSet<FactKey>,
    level: EnforcementLevel,
) -> Vec<GroundingViolation> {
    if !level.requires_grounding() {
        return Vec::new();
    }

    let mut violations = Vec::new();
    if output.facts_used.is_empty() {
        violations.push(GroundingViolation::EmptyFactsUsed);
    }

    let mut seen = BTreeSet::new();
    for key in &output.facts_used {
        if !offered.contains(key) && seen.insert(key) {
            violations.push(GroundingViolation::UnknownFact { key: key.clone() });
        }
    }

    if !(0.0..=1.0).contains(&output.confidence) {
        violations.push(GroundingViolation::ConfidenceOutOfRange {
            value: output.confidence,
        });
    }
    violations
}

/// `validate_grounding` as a `Result`, for callers that stop on rejection
pub fn ensure_grounded(
    output: &EditorOutput,
    offered: &BTreeSet<FactKey>,
    level: EnforcementLevel,
) -> Result<()> {
    let violations = validate_grounding(output, offered, level);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(FactweaveError::Grounding(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offered(keys: &[&str]) -> BTreeSet<FactKey> {
        keys.iter().map(|k| FactKey::from(*k)).collect()
    }

    fn output(facts: &[&str]) -> EditorOutput {
        EditorOutput {
            edited_text: "The shop runs on Django.".to_string(),
            facts_used: facts.iter().map(|k| FactKey::from(*k)).collect(),
            changes_made: vec!["tightened wording".to_string()],
            confidence: 0.8,
        }
    }

    #[test]
    fn test_l1_accepts_anything() {
        let mut out = output(&[]);
        out.confidence = 7.0;
        assert!(validate_grounding(&out, &offered(&[]), EnforcementLevel::L1).is_empty());
    }

    #[test]
    fn test_l2_rejects_empty_facts_used() {
        let violations = validate_grounding(&output(&[]), &offered(&["architecture"]), EnforcementLevel::L2);
        assert_eq!(violations, vec![GroundingViolation::EmptyFactsUsed]);
    }

    #[test]
    fn test_l3_lists_every_unknown_fact_once() {
        let out = output(&["architecture", "models.Order", "models.Order", "api.summary"]);
        let violations = validate_grounding(&out, &offered(&["architecture"]), EnforcementLevel::L3);
        assert_eq!(
            violations,
            vec![
                GroundingViolation::UnknownFact { key: FactKey::from("models.Order") },
                GroundingViolation::UnknownFact { key: FactKey::from("api.summary") },
            ]
        );
    }

    #[test]
    fn test_grounded_output_passes() {
        let out = output(&["architecture", "frameworks.django"]);
        let keys = offered(&["architecture", "frameworks.django", "languages.python"]);
        assert!(ensure_grounded(&out, &keys, EnforcementLevel::L2).is_ok());
    }

    #[test]
    fn test_confidence_out_of_range() {
        let mut out = output(&["architecture"]);
        out.confidence = 1.4;
        assert_eq!(out.clamped_confidence(), 1.0);
        let err = ensure_grounded(&out, &offered(&["architecture"]), EnforcementLevel::L2).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }

    #[test]
    fn test_parse_editor_output() {
        let raw = r#"{"edited_text":"x","facts_used":["languages.python"],"changes_made":[],"confidence":0.5}"#;
        let out = EditorOutput::from_json(raw).unwrap();
        assert_eq!(out.facts_used, vec![FactKey::from("languages.python")]);
        assert!(EditorOutput::from_json("{\"facts_used\":[]}").is_err());
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("l2".parse::<EnforcementLevel>().unwrap(), EnforcementLevel::L2);
        assert!("L4".parse::<EnforcementLevel>().is_err());
        let level: EnforcementLevel = serde_json::from_str("\"l3\"").unwrap();
        assert_eq!(level, EnforcementLevel::L3);
    }
}
