//! Grounded Editor
//!
//! Prepares an edit request for a generated section and reviews the answer.
//! Terminology is normalized with the glossary before the text is sent; the
//! answer must then pass the grounding check for the configured level.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::collaborator::GenerationRequest;
use crate::config::EditorConfig;
use crate::context::ContextPack;
use crate::types::{FactKey, Result};
use crate::validation::{
    EditorOutput, EnforcementLevel, Glossary, TermReplacement, ensure_grounded,
};

const EDITOR_SYSTEM: &str = "You are an editor improving one section of technical documentation. \
Keep its meaning and structure. Return the edited text, the keys of the facts it relies on, \
a short list of the changes you made and your confidence between 0 and 1.";

const GROUNDED_RULES: &str = "Only rely on the facts listed below or on the original text. \
Every fact you rely on must appear in `facts_used` by its key.";

const POLISH_RULES: &str = "Raise the prose to publication quality: precise wording, \
no filler, consistent terminology.";

/// Accepted edit with the terminology pass that preceded it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditOutcome {
    pub output: EditorOutput,
    pub replacements: Vec<TermReplacement>,
    pub level: EnforcementLevel,
}

#[derive(Debug, Clone, Default)]
pub struct GroundedEditor {
    glossary: Glossary,
    level: EnforcementLevel,
}

impl GroundedEditor {
    pub fn new(glossary: Glossary, level: EnforcementLevel) -> Self {
        Self { glossary, level }
    }

    pub fn from_config(config: &EditorConfig) -> Result<Self> {
        Ok(Self::new(Glossary::new(&config.glossary)?, config.level))
    }

    pub fn with_level(mut self, level: EnforcementLevel) -> Self {
        self.level = level;
        self
    }

    pub fn level(&self) -> EnforcementLevel {
        self.level
    }

    /// Glossary pass over the text to be edited
    pub fn prepare(&self, text: &str) -> (String, Vec<TermReplacement>) {
        self.glossary.normalize(text)
    }

    /// Edit request for `text`, offering the facts of the section's pack
    pub fn request(&self, text: &str, pack: &ContextPack) -> GenerationRequest {
        let mut system_prompt = EDITOR_SYSTEM.to_string();
        if self.level.requires_grounding() {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(GROUNDED_RULES);
        }
        if self.level == EnforcementLevel::L3 {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(POLISH_RULES);
        }

        let facts: Vec<&str> = pack.selected_keys.iter().map(FactKey::as_str).collect();
        let user_prompt = format!(
            "# Section\n{}\n\n# Offered facts\n{}\n\n# Text\n{}\n",
            pack.section,
            facts.join("\n"),
            text
        );

        GenerationRequest {
            system_prompt,
            user_prompt,
            schema: EditorOutput::schema(),
        }
    }

    /// Parse a collaborator answer and reject it when it is not grounded
    pub fn review(&self, value: Value, offered: &BTreeSet<FactKey>) -> Result<EditorOutput> {
        let output = EditorOutput::from_value(value)?;
        ensure_grounded(&output, offered, self.level)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlossaryTerm;
    use crate::context::Budget;
    use crate::types::{DocumentId, FactweaveError, SectionKind};
    use serde_json::json;

    fn pack() -> ContextPack {
        ContextPack {
            document_id: DocumentId::from("doc"),
            section: SectionKind::Theory,
            attempt: 1,
            template_id: "theory.v1".to_string(),
            template_version: 1,
            system_prompt: String::new(),
            user_prompt: String::new(),
            selected_keys: vec![FactKey::from("architecture"), FactKey::from("languages.python")],
            budget: Budget::new(4000, 2000, 30),
            estimated_tokens: 100,
            fingerprint: String::new(),
        }
    }

    fn editor(level: EnforcementLevel) -> GroundedEditor {
        GroundedEditor::from_config(&EditorConfig {
            level,
            glossary: vec![GlossaryTerm {
                canonical: "database".to_string(),
                variants: vec!["DB".to_string()],
            }],
        })
        .unwrap()
    }

    #[test]
    fn test_request_mentions_offered_facts_and_rules() {
        let request = editor(EnforcementLevel::L3).request("Body", &pack());
        assert!(request.user_prompt.contains("languages.python"));
        assert!(request.system_prompt.contains("facts_used"));
        assert!(request.system_prompt.contains("publication quality"));

        let plain = editor(EnforcementLevel::L1).request("Body", &pack());
        assert!(!plain.system_prompt.contains(GROUNDED_RULES));
    }

    #[test]
    fn test_prepare_normalizes_terms() {
        let (text, replacements) = editor(EnforcementLevel::L1).prepare("The DB is Postgres.");
        assert_eq!(text, "The database is Postgres.");
        assert_eq!(replacements.len(), 1);
    }

    #[test]
    fn test_review_rejects_ungrounded_output() {
        let offered: BTreeSet<FactKey> = pack().selected_keys.into_iter().collect();
        let answer = json!({
            "edited_text": "Edited",
            "facts_used": [],
            "changes_made": ["shorter"],
            "confidence": 0.9
        });

        let err = editor(EnforcementLevel::L2)
            .review(answer.clone(), &offered)
            .unwrap_err();
        assert!(matches!(err, FactweaveError::Grounding(ref v) if !v.is_empty()));

        let accepted = editor(EnforcementLevel::L1).review(answer, &offered).unwrap();
        assert_eq!(accepted.edited_text, "Edited");
    }
}
