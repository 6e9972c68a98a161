use std::collections::BTreeMap;

use super::{DetectorInput, Facet, FactDetector};
use crate::types::{DependencyFact, FrameworkFact, Result};

/// (dependency, framework name, framework type)
type FrameworkRule = (&'static str, &'static str, &'static str);

const PYPI_FRAMEWORKS: &[FrameworkRule] = &[
    ("django", "django", "backend"),
    ("djangorestframework", "django-rest-framework", "api"),
    ("fastapi", "fastapi", "backend"),
    ("flask", "flask", "backend"),
    ("sqlalchemy", "sqlalchemy", "orm"),
    ("celery", "celery", "task-queue"),
    ("pydantic", "pydantic", "validation"),
    ("pytest", "pytest", "testing"),
    ("alembic", "alembic", "migrations"),
];

const NPM_FRAMEWORKS: &[FrameworkRule] = &[
    ("react", "react", "frontend"),
    ("vue", "vue.js", "frontend"),
    ("@angular/core", "angular", "frontend"),
    ("svelte", "svelte", "frontend"),
    ("next", "next.js", "fullstack"),
    ("nuxt", "nuxt.js", "fullstack"),
    ("express", "express", "backend"),
    ("@nestjs/core", "nestjs", "backend"),
    ("axios", "axios", "http-client"),
    ("pinia", "pinia", "state"),
    ("redux", "redux", "state"),
    ("@reduxjs/toolkit", "redux", "state"),
    ("zustand", "zustand", "state"),
    ("vite", "vite", "build"),
    ("prisma", "prisma", "orm"),
    ("@prisma/client", "prisma", "orm"),
    ("typeorm", "typeorm", "orm"),
    ("jest", "jest", "testing"),
];

const CRATES_FRAMEWORKS: &[FrameworkRule] = &[
    ("axum", "axum", "backend"),
    ("actix-web", "actix-web", "backend"),
    ("rocket", "rocket", "backend"),
    ("tokio", "tokio", "runtime"),
    ("diesel", "diesel", "orm"),
    ("sqlx", "sqlx", "orm"),
    ("sea-orm", "sea-orm", "orm"),
];

fn rules_for(ecosystem: &str) -> &'static [FrameworkRule] {
    match ecosystem {
        "pypi" => PYPI_FRAMEWORKS,
        "npm" => NPM_FRAMEWORKS,
        "crates" => CRATES_FRAMEWORKS,
        _ => &[],
    }
}

fn classify(dep: &DependencyFact) -> Option<&'static FrameworkRule> {
    rules_for(&dep.ecosystem)
        .iter()
        .find(|(package, _, _)| dep.name.eq_ignore_ascii_case(package))
}

/// Frameworks recognized from declared runtime dependencies
pub struct FrameworkDetector;

impl FactDetector for FrameworkDetector {
    fn name(&self) -> &'static str {
        "frameworks"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        let mut found: BTreeMap<&'static str, FrameworkFact> = BTreeMap::new();

        for dep in &input.facts.runtime.dependencies {
            let Some((_, name, kind)) = classify(dep) else {
                continue;
            };
            let fact = found.entry(*name).or_insert_with(|| FrameworkFact {
                name: name.to_string(),
                kind: kind.to_string(),
                source: format!("{}:{}", dep.ecosystem, dep.name),
                evidence: Vec::new(),
            });
            // Aliases (redux, @reduxjs/toolkit) pool their evidence
            for ev in &dep.evidence {
                if !fact.evidence.contains(ev) {
                    fact.evidence.push(ev.clone());
                }
            }
        }

        Ok(Facet::Frameworks(found.into_values().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MemorySourceTree;
    use crate::types::{Evidence, Facts, RepoInfo};

    fn dep(name: &str, ecosystem: &str) -> DependencyFact {
        DependencyFact {
            name: name.to_string(),
            version: "*".to_string(),
            ecosystem: ecosystem.to_string(),
            dev: false,
            evidence: vec![Evidence::file(format!("{}.manifest", ecosystem))],
        }
    }

    fn detect(deps: Vec<DependencyFact>) -> Vec<FrameworkFact> {
        let mut facts = Facts::empty(RepoInfo::new("u", "c"));
        facts.runtime.dependencies = deps;
        let tree = MemorySourceTree::new();
        let input = DetectorInput {
            tree: &tree,
            files: &[],
            facts: &facts,
        };
        match FrameworkDetector.detect(&input).unwrap() {
            Facet::Frameworks(v) => v,
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_frameworks_from_dependencies() {
        let found = detect(vec![
            dep("django", "pypi"),
            dep("requests", "pypi"),
            dep("vue", "npm"),
            dep("axios", "npm"),
        ]);
        let names: Vec<_> = found.iter().map(|f| (f.name.as_str(), f.kind.as_str())).collect();
        assert_eq!(
            names,
            vec![
                ("axios", "http-client"),
                ("django", "backend"),
                ("vue.js", "frontend")
            ]
        );
        assert_eq!(found[1].source, "pypi:django");
        assert_eq!(found[1].evidence[0].path, "pypi.manifest");
    }

    #[test]
    fn test_ecosystem_scoped_lookup() {
        // "react" published on pypi is not the JS framework
        assert!(detect(vec![dep("react", "pypi")]).is_empty());
    }

    #[test]
    fn test_aliases_collapse() {
        let found = detect(vec![dep("redux", "npm"), dep("@reduxjs/toolkit", "npm")]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "redux");
    }
}
