use std::collections::BTreeSet;

use super::{DetectorInput, Facet, FactDetector};
use crate::types::{Evidence, ModuleFact, Result};

/// Top-level directories whose children are the real modules
const CONTAINER_DIRS: &[&str] = &[
    "backend", "frontend", "server", "client", "api", "web", "src", "app",
];

fn role_for(name: &str) -> Option<&'static str> {
    let role = match name.to_lowercase().as_str() {
        "api" | "routers" | "routes" | "endpoints" => "api",
        "models" | "entities" => "data-model",
        "services" => "service-layer",
        "components" => "ui-components",
        "views" | "pages" => "views",
        "store" | "stores" => "state",
        "utils" | "helpers" | "lib" => "utilities",
        "tests" | "test" | "__tests__" => "tests",
        "config" | "settings" => "configuration",
        "migrations" => "migrations",
        "core" => "core",
        "schemas" => "schemas",
        _ => return None,
    };
    Some(role)
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Immediate child directories of `prefix` (which ends with `/`)
fn child_dirs<'a>(files: &'a [String], prefix: &str) -> BTreeSet<&'a str> {
    files
        .iter()
        .filter_map(|path| path.strip_prefix(prefix))
        .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir))
        .filter(|dir| !is_ignored(dir))
        .collect()
}

/// Logical modules: children of container directories plus other top-level dirs
pub struct ModuleDetector;

impl ModuleDetector {
    fn module(files: &[String], path: String, name: &str, role: &str) -> Option<ModuleFact> {
        let prefix = format!("{}/", path);
        let members: Vec<&String> = files.iter().filter(|f| f.starts_with(&prefix)).collect();
        let first = members.first()?;

        let submodules = child_dirs(files, &prefix)
            .into_iter()
            .map(|sub| format!("{}:{}", sub, role_for(sub).unwrap_or("submodule")))
            .collect();

        Some(ModuleFact {
            name: name.to_string(),
            evidence: vec![Evidence::file(first.as_str())],
            files: members.len() as u64,
            role: role.to_string(),
            submodules,
            path,
        })
    }
}

impl FactDetector for ModuleDetector {
    fn name(&self) -> &'static str {
        "modules"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        let mut modules = Vec::new();

        for top in input.top_level_dirs() {
            if is_ignored(top) {
                continue;
            }

            if CONTAINER_DIRS.contains(&top) {
                for child in child_dirs(input.files, &format!("{}/", top)) {
                    let path = format!("{}/{}", top, child);
                    let role = role_for(child).unwrap_or("module");
                    modules.extend(Self::module(input.files, path, child, role));
                }
            } else {
                modules.extend(Self::module(
                    input.files,
                    top.to_string(),
                    top,
                    "top-level",
                ));
            }
        }

        modules.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Facet::Modules(modules))
    }
}
