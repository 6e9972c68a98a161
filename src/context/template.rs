//! Versioned prompt templates, one per section kind

use serde_json::{Value, json};

use crate::types::SectionKind;

const GROUNDING_RULES: &str = "Use only the facts listed in this prompt and the synopses of earlier sections. \
Do not invent components, endpoints, versions or numbers. \
List the keys of every fact you rely on in `facts_used`.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub version: u32,
    pub section: SectionKind,
    system: &'static str,
    instructions: &'static str,
}

const OUTLINE: PromptTemplate = PromptTemplate {
    id: "outline.v1",
    version: 1,
    section: SectionKind::Outline,
    system: "You are a technical writer planning documentation for a software repository.",
    instructions: "Write the document outline: a title, then 4-8 headings with one-line \
descriptions of what each part covers. Follow the repository's real structure.",
};

const THEORY: PromptTemplate = PromptTemplate {
    id: "theory.v1",
    version: 1,
    section: SectionKind::Theory,
    system: "You are a software architect explaining how a system is designed.",
    instructions: "Explain the architecture, the role of each layer and framework, and how \
the parts interact. Stay conceptual; concrete walkthroughs belong to the practice section.",
};

const PRACTICE: PromptTemplate = PromptTemplate {
    id: "practice.v1",
    version: 1,
    section: SectionKind::Practice,
    system: "You are a senior engineer writing hands-on documentation.",
    instructions: "Describe concrete project entities by name, give at least one algorithm \
as numbered steps with explicit Input and Output, and include a markdown table \
(for example of endpoints or models).",
};

const CONCLUSION: PromptTemplate = PromptTemplate {
    id: "conclusion.v1",
    version: 1,
    section: SectionKind::Conclusion,
    system: "You are a technical writer closing a documentation set.",
    instructions: "Summarize the key takeaways of the previous sections, the main risks and \
the natural next steps. Do not introduce facts that earlier sections did not use.",
};

impl PromptTemplate {
    pub fn for_section(section: SectionKind) -> Self {
        match section {
            SectionKind::Outline => OUTLINE,
            SectionKind::Theory => THEORY,
            SectionKind::Practice => PRACTICE,
            SectionKind::Conclusion => CONCLUSION,
        }
    }

    pub fn system_prompt(&self) -> String {
        format!("{}\n\n{}", self.system, GROUNDING_RULES)
    }

    /// User prompt with the facts block and dependency synopses filled in
    pub fn render_user(&self, facts_block: &str, synopses_block: &str, max_output_tokens: usize) -> String {
        let mut out = format!(
            "# Task\n{}\n\n# Section\n{}\n\n# Length\nAt most {} tokens.\n\n# Facts\n{}\n",
            self.instructions, self.section, max_output_tokens, facts_block
        );
        if !synopses_block.is_empty() {
            out.push_str("\n# Earlier sections\n");
            out.push_str(synopses_block);
        }
        out
    }

    /// JSON schema the generation collaborator is asked to satisfy
    pub fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["text", "facts_used"],
            "properties": {
                "text": { "type": "string", "description": format!("{} section in markdown", self.section) },
                "facts_used": { "type": "array", "items": { "type": "string" } }
            }
        })
    }
}
