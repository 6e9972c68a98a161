use std::collections::BTreeMap;

use super::{DetectorInput, Facet, FactDetector, file_name};
use crate::types::{ArchitectureFact, Evidence, Facts, Result};

const FRONTEND_MARKERS: &[&str] = &["frontend", "client", "web", "ui"];
const BACKEND_MARKERS: &[&str] = &["backend", "server", "api"];
const SSR_FRAMEWORKS: &[&str] = &["next.js", "nuxt.js"];
const JWT_PACKAGES: &[&str] = &[
    "python-jose",
    "pyjwt",
    "jsonwebtoken",
    "djangorestframework-simplejwt",
];

fn has_framework(facts: &Facts, name: &str) -> bool {
    facts.frameworks.iter().any(|f| f.name == name)
}

fn framework_of_kind<'a>(facts: &'a Facts, kind: &str) -> Option<&'a str> {
    facts
        .frameworks
        .iter()
        .find(|f| f.kind == kind)
        .map(|f| f.name.as_str())
}

/// Architecture classification from directory layout and known frameworks
pub struct ArchitectureDetector;

impl ArchitectureDetector {
    fn details(facts: &Facts) -> BTreeMap<String, String> {
        let mut details = BTreeMap::new();

        if !facts.api.endpoints.is_empty()
            || facts
                .frameworks
                .iter()
                .any(|f| f.kind == "backend" || f.kind == "api")
        {
            details.insert("api_type".to_string(), "REST".to_string());
        }
        if let Some(orm) = framework_of_kind(facts, "orm") {
            details.insert("orm".to_string(), orm.to_string());
        }
        if facts
            .runtime
            .dependencies
            .iter()
            .any(|d| JWT_PACKAGES.contains(&d.name.to_lowercase().as_str()))
        {
            details.insert("auth".to_string(), "JWT".to_string());
        }
        if has_framework(facts, "axios") {
            details.insert("http_client".to_string(), "axios".to_string());
        }
        if let Some(state) = framework_of_kind(facts, "state") {
            details.insert("state_management".to_string(), state.to_string());
        }

        details
    }
}

impl FactDetector for ArchitectureDetector {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        let facts = input.facts;
        let dirs = input.top_level_dirs();

        let frontend_dir = dirs.iter().find(|d| FRONTEND_MARKERS.contains(*d));
        let backend_dir = dirs.iter().find(|d| BACKEND_MARKERS.contains(*d));
        let dockerized = input
            .files_named(|name| name == "Dockerfile" || name.starts_with("docker-compose"))
            .next();

        let mut details = Self::details(facts);

        let arch_type = if SSR_FRAMEWORKS.iter().any(|f| has_framework(facts, f)) {
            "fullstack-ssr"
        } else {
            match (frontend_dir, backend_dir) {
                (Some(_), Some(_)) => {
                    details.insert("separation".to_string(), "monorepo".to_string());
                    "client-server"
                }
                (Some(_), None) => "spa",
                (None, Some(_)) => "api",
                (None, None) => "monolith",
            }
        };

        let has_frontend_framework = framework_of_kind(facts, "frontend").is_some();
        let has_backend_framework = framework_of_kind(facts, "backend").is_some();
        let has_data = framework_of_kind(facts, "orm").is_some() || !facts.models.is_empty();

        let mut layers = Vec::new();
        if frontend_dir.is_some() || has_frontend_framework {
            layers.push("frontend".to_string());
        }
        if backend_dir.is_some() || has_backend_framework {
            layers.push("backend".to_string());
        }
        if has_data {
            layers.push("data".to_string());
        }
        if dockerized.is_some() {
            layers.push("infra".to_string());
        }
        if layers.is_empty() {
            layers.push("unknown".to_string());
        }

        // Evidence: the marker directories' first files and any container file
        let mut evidence = Vec::new();
        for dir in [frontend_dir, backend_dir].into_iter().flatten() {
            let prefix = format!("{}/", dir);
            if let Some(first) = input.files.iter().find(|f| f.starts_with(&prefix)) {
                evidence.push(Evidence::file(first.as_str()));
            }
        }
        if let Some(docker) = dockerized {
            evidence.push(Evidence::file(docker.as_str()));
        }
        if evidence.is_empty()
            && let Some(first) = input.files.iter().find(|f| !file_name(f).starts_with('.'))
        {
            evidence.push(Evidence::file(first.as_str()));
        }

        Ok(Facet::Architecture(ArchitectureFact {
            arch_type: arch_type.to_string(),
            layers,
            details,
            evidence,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MemorySourceTree;
    use crate::types::{DependencyFact, FrameworkFact, RepoInfo};

    fn framework(name: &str, kind: &str) -> FrameworkFact {
        FrameworkFact {
            name: name.to_string(),
            kind: kind.to_string(),
            source: format!("x:{}", name),
            evidence: vec![],
        }
    }

    fn detect(files: &[&str], facts: &Facts) -> ArchitectureFact {
        let files: Vec<String> = files.iter().map(|s| s.to_string()).collect();
        let tree = MemorySourceTree::new();
        let input = DetectorInput {
            tree: &tree,
            files: &files,
            facts,
        };
        match ArchitectureDetector.detect(&input).unwrap() {
            Facet::Architecture(v) => v,
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_client_server_monorepo() {
        let mut facts = Facts::empty(RepoInfo::new("u", "c"));
        facts.frameworks = vec![
            framework("django", "backend"),
            framework("vue.js", "frontend"),
            framework("sqlalchemy", "orm"),
            framework("pinia", "state"),
        ];
        facts.runtime.dependencies.push(DependencyFact {
            name: "pyjwt".to_string(),
            version: "*".to_string(),
            ecosystem: "pypi".to_string(),
            dev: false,
            evidence: vec![],
        });

        let arch = detect(
            &["backend/app.py", "frontend/src/main.ts", "docker-compose.yml"],
            &facts,
        );
        assert_eq!(arch.arch_type, "client-server");
        assert_eq!(arch.layers, vec!["frontend", "backend", "data", "infra"]);
        assert_eq!(arch.details["separation"], "monorepo");
        assert_eq!(arch.details["orm"], "sqlalchemy");
        assert_eq!(arch.details["auth"], "JWT");
        assert_eq!(arch.details["state_management"], "pinia");
        assert_eq!(arch.evidence.len(), 3);
    }

    #[test]
    fn test_ssr_framework_wins() {
        let mut facts = Facts::empty(RepoInfo::new("u", "c"));
        facts.frameworks = vec![framework("next.js", "fullstack")];
        let arch = detect(&["frontend/pages/index.tsx", "api/x.ts"], &facts);
        assert_eq!(arch.arch_type, "fullstack-ssr");
    }

    #[test]
    fn test_unknown_layers_for_bare_repo() {
        let facts = Facts::empty(RepoInfo::new("u", "c"));
        let arch = detect(&["README.md"], &facts);
        assert_eq!(arch.arch_type, "monolith");
        assert_eq!(arch.layers, vec!["unknown"]);
        assert_eq!(arch.evidence[0].path, "README.md");
    }
}
