//! Context Pack Builder
//!
//! ```text
//! records ──► mandatory (languages, architecture) ──► reserve ──► BudgetTooSmall?
//!         └─► optional ──► rank(policy) ──► greedy fill (full, then compact)
//! ```

use tracing::debug;

use super::budget::{Budget, TokenBudget};
use super::pack::{ContextPack, fingerprint};
use super::policy::RankingPolicy;
use super::synopsis::Synopsis;
use super::template::PromptTemplate;
use crate::constants::context as context_constants;
use crate::types::{DocumentId, FactKind, FactRecord, FactweaveError, Facts, Result, SectionKind};

/// Inputs for one pack
#[derive(Debug, Clone, Copy)]
pub struct PackRequest<'a> {
    pub document_id: &'a DocumentId,
    pub section: SectionKind,
    pub attempt: u32,
    pub facts: &'a Facts,
    /// Synopses of the dependency sections, in dependency order
    pub synopses: &'a [Synopsis],
}

#[derive(Debug, Clone)]
pub struct ContextPackBuilder {
    budget: Budget,
    synopsis_max_chars: usize,
}

impl ContextPackBuilder {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            synopsis_max_chars: context_constants::SYNOPSIS_MAX_CHARS,
        }
    }

    pub fn with_synopsis_max_chars(mut self, max_chars: usize) -> Self {
        self.synopsis_max_chars = max_chars;
        self
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn build(&self, request: PackRequest<'_>) -> Result<ContextPack> {
        let template = PromptTemplate::for_section(request.section);
        let policy = RankingPolicy::for_section(request.section);
        let records = request.facts.records();

        let synopses_block: String = request
            .synopses
            .iter()
            .map(|s| s.clone().bounded(self.synopsis_max_chars).render())
            .collect();

        let system_prompt = template.system_prompt();
        let skeleton = template.render_user("", &synopses_block, self.budget.max_output_tokens);

        let mut tokens = TokenBudget::new(self.budget.max_input_tokens);
        let base = context_constants::MESSAGE_OVERHEAD_TOKENS
            + tokens.count(&system_prompt)
            + tokens.count(&skeleton);
        tokens.reserve(base);

        // Mandatory reservation, in document order
        let mut selected: Vec<&FactRecord> = Vec::new();
        let mut lines: Vec<String> = Vec::new();
        for record in records.iter().filter(|r| r.kind.is_mandatory()) {
            let line = record.render();
            tokens.reserve(tokens.count(&line) + 1);
            selected.push(record);
            lines.push(line);
        }
        if tokens.current() > self.budget.max_input_tokens {
            return Err(FactweaveError::BudgetTooSmall {
                required: tokens.current(),
                budget: self.budget.max_input_tokens,
            });
        }

        let mut chars: usize = lines.iter().map(|l| l.chars().count() + 1).sum();
        let soft_limit = self.budget.soft_char_limit();

        let mut endpoints = 0usize;
        let optional = policy.rank(records.iter().filter(|r| !r.kind.is_mandatory()));
        for record in optional {
            if selected.len() >= self.budget.max_facts {
                break;
            }
            if record.kind == FactKind::Endpoint {
                if endpoints >= context_constants::MAX_ENDPOINT_FACTS {
                    continue;
                }
                endpoints += 1;
            }

            let full = record.render();
            let line = if tokens.try_add(&format!("{}\n", full)) {
                full
            } else {
                let compact = record.render_compact();
                if !tokens.try_add(&format!("{}\n", compact)) {
                    debug!(key = %record.key, "Fact dropped by budget");
                    continue;
                }
                compact
            };

            let line_chars = line.chars().count() + 1;
            if chars + line_chars > soft_limit {
                debug!(key = %record.key, "Fact dropped by soft char limit");
                break;
            }
            chars += line_chars;
            selected.push(record);
            lines.push(line);
        }

        let facts_block = lines.join("\n");
        let user_prompt =
            template.render_user(&facts_block, &synopses_block, self.budget.max_output_tokens);
        let selected_keys: Vec<_> = selected.iter().map(|r| r.key.clone()).collect();
        let fingerprint = fingerprint(template.id, &user_prompt, &selected_keys, &self.budget)?;

        debug!(
            section = %request.section,
            selected = selected_keys.len(),
            available = records.len(),
            tokens = tokens.current(),
            "Context pack built"
        );

        Ok(ContextPack {
            document_id: request.document_id.clone(),
            section: request.section,
            attempt: request.attempt,
            template_id: template.id.to_string(),
            template_version: template.version,
            system_prompt,
            user_prompt,
            selected_keys,
            budget: self.budget,
            estimated_tokens: tokens.current(),
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ArchitectureFact, DependencyFact, Evidence, FactKey, FrameworkFact, LanguageFact, RepoInfo,
    };
    use proptest::prelude::*;

    fn language(name: &str, ratio: f64) -> LanguageFact {
        LanguageFact {
            name: name.to_string(),
            ratio,
            lines_of_code: (ratio * 1000.0) as u64,
            files: 3,
            evidence: vec![Evidence::file(format!("src/main.{}", name))],
        }
    }

    fn dependency(idx: usize) -> DependencyFact {
        DependencyFact {
            name: format!("supporting-library-number-{:02}", idx),
            version: ">=1.0".to_string(),
            ecosystem: "pypi".to_string(),
            dev: false,
            evidence: vec![Evidence::file("requirements.txt").with_line(idx as u32 + 1)],
        }
    }

    fn django_facts(deps: usize) -> Facts {
        let mut facts = Facts::empty(RepoInfo::new("https://example.com/shop.git", "abc123"));
        facts.languages = vec![language("python", 0.8), language("typescript", 0.2)];
        facts.frameworks = vec![FrameworkFact {
            name: "django".to_string(),
            kind: "backend".to_string(),
            source: "pypi:django".to_string(),
            evidence: vec![Evidence::file("requirements.txt").with_line(1)],
        }];
        facts.architecture = ArchitectureFact {
            arch_type: "monolith".to_string(),
            layers: vec!["backend".to_string()],
            details: Default::default(),
            evidence: vec![Evidence::file("manage.py")],
        };
        facts.runtime.dependencies = (0..deps).map(dependency).collect();
        facts
    }

    fn build(facts: &Facts, section: SectionKind, budget: Budget) -> Result<ContextPack> {
        let id = DocumentId::from("doc");
        ContextPackBuilder::new(budget).build(PackRequest {
            document_id: &id,
            section,
            attempt: 1,
            facts,
            synopses: &[],
        })
    }

    #[test]
    fn test_tight_theory_budget_keeps_mandatory_and_drops_dependencies_first() {
        let facts = django_facts(20);
        let roomy = build(&facts, SectionKind::Theory, Budget::new(100_000, 2000, 100)).unwrap();
        assert_eq!(roomy.selected_keys.len(), facts.records().len());

        let tight = Budget::new(roomy.estimated_tokens - 200, 2000, 100);
        let pack = build(&facts, SectionKind::Theory, tight).unwrap();

        for key in ["languages.python", "languages.typescript", "architecture", "frameworks.django"] {
            assert!(pack.contains(&FactKey::from(key)), "missing {}", key);
        }
        let dropped: Vec<_> = facts
            .keys()
            .into_iter()
            .filter(|k| !pack.contains(k))
            .collect();
        assert!(!dropped.is_empty());
        assert!(
            dropped
                .iter()
                .all(|k| k.as_str().starts_with("runtime.dependencies."))
        );
        assert!(pack.estimated_tokens <= tight.max_input_tokens);
    }

    #[test]
    fn test_mandatory_facts_come_first() {
        let pack = build(&django_facts(3), SectionKind::Practice, Budget::new(4000, 2000, 30)).unwrap();
        let first: Vec<_> = pack.selected_keys.iter().take(3).map(FactKey::as_str).collect();
        assert_eq!(first, vec!["languages.python", "languages.typescript", "architecture"]);
    }

    #[test]
    fn test_budget_too_small() {
        let err = build(&django_facts(0), SectionKind::Theory, Budget::new(50, 100, 30)).unwrap_err();
        match err {
            FactweaveError::BudgetTooSmall { required, budget } => {
                assert_eq!(budget, 50);
                assert!(required > 50);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_max_facts_caps_selection() {
        let pack = build(&django_facts(10), SectionKind::Outline, Budget::new(100_000, 2000, 5)).unwrap();
        assert_eq!(pack.selected_keys.len(), 5);
    }

    #[test]
    fn test_synopses_are_rendered_and_bounded() {
        let facts = django_facts(0);
        let id = DocumentId::from("doc");
        let synopsis = Synopsis {
            section: SectionKind::Outline,
            bullets: vec!["x".repeat(2000)],
        };
        let pack = ContextPackBuilder::new(Budget::new(100_000, 2000, 30))
            .with_synopsis_max_chars(100)
            .build(PackRequest {
                document_id: &id,
                section: SectionKind::Theory,
                attempt: 1,
                facts: &facts,
                synopses: std::slice::from_ref(&synopsis),
            })
            .unwrap();
        assert!(pack.user_prompt.contains("### outline"));
        assert!(!pack.user_prompt.contains(&"x".repeat(200)));
    }

    #[test]
    fn test_identical_inputs_identical_pack() {
        let facts = django_facts(5);
        let a = build(&facts, SectionKind::Theory, Budget::new(4000, 2000, 30)).unwrap();
        let b = build(&facts, SectionKind::Theory, Budget::new(4000, 2000, 30)).unwrap();
        assert_eq!(a, b);
        assert!(a.verify_fingerprint().unwrap());
    }

    proptest! {
        #[test]
        fn prop_selection_is_subset_with_mandatory(
            deps in 0usize..30,
            max_in in 300usize..6000,
            max_facts in 1usize..40,
            section_idx in 0usize..4,
        ) {
            let facts = django_facts(deps);
            let section = SectionKind::ALL[section_idx];
            match build(&facts, section, Budget::new(max_in, 500, max_facts)) {
                Ok(pack) => {
                    let all = facts.keys();
                    prop_assert!(pack.selected_keys.iter().all(|k| all.contains(k)));
                    prop_assert!(pack.contains(&FactKey::from("languages.python")));
                    prop_assert!(pack.contains(&FactKey::from("architecture")));
                    prop_assert!(pack.estimated_tokens <= max_in);
                }
                Err(FactweaveError::BudgetTooSmall { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {}", other),
            }
        }
    }
}
