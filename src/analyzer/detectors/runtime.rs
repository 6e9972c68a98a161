use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value as JsonValue;
use toml::Value as TomlValue;

use super::{DetectorInput, Facet, FactDetector, file_name, line_of};
use crate::types::{
    DependencyFact, Evidence, FactweaveError, Result, RuntimeFacts, log_filter_warn,
};

const BUILD_FILES: &[&str] = &[
    "Dockerfile",
    "Makefile",
    "setup.py",
    "setup.cfg",
    "pyproject.toml",
    "package.json",
    "tsconfig.json",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
];

const BUILD_FILE_PREFIXES: &[&str] = &[
    "docker-compose",
    "vite.config.",
    "webpack.config.",
    "next.config.",
    "nuxt.config.",
];

const ENTRYPOINTS: &[&str] = &[
    "main.py", "app.py", "manage.py", "wsgi.py", "asgi.py", "index.js", "app.js", "server.js",
    "main.go", "main.rs", "index.ts", "main.ts",
];

fn is_build_file(name: &str) -> bool {
    BUILD_FILES.contains(&name) || BUILD_FILE_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn is_requirements(name: &str) -> bool {
    name.starts_with("requirements") && name.ends_with(".txt")
}

/// Normalize python package names the way pip compares them
fn normalize_python(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

/// Runtime dependencies, build files and entrypoints
pub struct RuntimeDetector {
    requirement: Regex,
}

impl RuntimeDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            requirement: FactweaveError::compile(
                r"^([A-Za-z0-9_.\-]+)\s*(\[.+\])?\s*([<>=!~]+[^;#]+)?",
            )?,
        })
    }

    /// Parse one requirement spec into (name, version)
    fn parse_requirement(&self, spec: &str) -> Option<(String, String)> {
        let caps = self.requirement.captures(spec.trim())?;
        let name = normalize_python(caps.get(1)?.as_str());
        let version = caps
            .get(3)
            .map(|v| v.as_str().trim().to_string())
            .unwrap_or_else(|| "*".to_string());
        Some((name, version))
    }

    fn requirements_txt(&self, path: &str, content: &str) -> Vec<DependencyFact> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#') && !line.starts_with('-')
            })
            .filter_map(|(idx, line)| {
                let (name, version) = self.parse_requirement(line)?;
                Some(DependencyFact {
                    name,
                    version,
                    ecosystem: "pypi".to_string(),
                    dev: false,
                    evidence: vec![Evidence::file(path).with_line(idx as u32 + 1)],
                })
            })
            .collect()
    }

    fn pyproject(&self, path: &str, content: &str) -> Result<Vec<DependencyFact>> {
        let doc: TomlValue = toml::from_str(content)?;
        let mut deps = Vec::new();
        let mut push = |name: String, version: String, dev: bool| {
            let evidence = match line_of(content, &name) {
                Some(line) => Evidence::file(path).with_line(line),
                None => Evidence::file(path),
            };
            deps.push(DependencyFact {
                name,
                version,
                ecosystem: "pypi".to_string(),
                dev,
                evidence: vec![evidence],
            });
        };

        // PEP 621
        if let Some(list) = doc
            .get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(TomlValue::as_array)
        {
            for spec in list.iter().filter_map(TomlValue::as_str) {
                if let Some((name, version)) = self.parse_requirement(spec) {
                    push(name, version, false);
                }
            }
        }

        // Poetry
        let poetry = doc.get("tool").and_then(|t| t.get("poetry"));
        for (table, dev) in [("dependencies", false), ("dev-dependencies", true)] {
            let Some(entries) = poetry
                .and_then(|p| p.get(table))
                .and_then(TomlValue::as_table)
            else {
                continue;
            };
            for (name, spec) in entries {
                if name == "python" {
                    continue;
                }
                push(normalize_python(name), toml_version(spec), dev);
            }
        }

        Ok(deps)
    }

    fn package_json(&self, path: &str, content: &str) -> Result<Vec<DependencyFact>> {
        let doc: JsonValue = serde_json::from_str(content)?;
        let mut deps = Vec::new();

        for (section, dev) in [("dependencies", false), ("devDependencies", true)] {
            let Some(entries) = doc.get(section).and_then(JsonValue::as_object) else {
                continue;
            };
            for (name, version) in entries {
                let quoted = format!("\"{}\"", name);
                let evidence = match line_of(content, &quoted) {
                    Some(line) => Evidence::file(path).with_line(line),
                    None => Evidence::file(path),
                };
                deps.push(DependencyFact {
                    name: name.clone(),
                    version: version.as_str().unwrap_or("*").to_string(),
                    ecosystem: "npm".to_string(),
                    dev,
                    evidence: vec![evidence],
                });
            }
        }

        Ok(deps)
    }

    fn cargo_toml(&self, path: &str, content: &str) -> Result<Vec<DependencyFact>> {
        let doc: TomlValue = toml::from_str(content)?;
        let mut deps = Vec::new();

        for (table, dev) in [("dependencies", false), ("dev-dependencies", true)] {
            let Some(entries) = doc.get(table).and_then(TomlValue::as_table) else {
                continue;
            };
            for (name, spec) in entries {
                let evidence = match line_of(content, &format!("{} ", name)) {
                    Some(line) => Evidence::file(path).with_line(line),
                    None => Evidence::file(path),
                };
                deps.push(DependencyFact {
                    name: name.clone(),
                    version: toml_version(spec),
                    ecosystem: "crates".to_string(),
                    dev,
                    evidence: vec![evidence],
                });
            }
        }

        Ok(deps)
    }
}

/// Version from either `name = "1.0"` or `name = { version = "1.0" }`
fn toml_version(spec: &TomlValue) -> String {
    spec.as_str()
        .or_else(|| spec.get("version").and_then(TomlValue::as_str))
        .unwrap_or("*")
        .to_string()
}

impl FactDetector for RuntimeDetector {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        // First declaration wins; files are visited in sorted order
        let mut dependencies: BTreeMap<String, DependencyFact> = BTreeMap::new();

        for path in input.files {
            let name = file_name(path);
            let parsed = if is_requirements(name) {
                Ok(self.requirements_txt(path, &input.tree.read(path)?))
            } else if name == "pyproject.toml" {
                self.pyproject(path, &input.tree.read(path)?)
            } else if name == "package.json" {
                self.package_json(path, &input.tree.read(path)?)
            } else if name == "Cargo.toml" {
                self.cargo_toml(path, &input.tree.read(path)?)
            } else {
                continue;
            };

            let Some(found) = log_filter_warn(parsed, &format!("Skipping manifest {}", path))
            else {
                continue;
            };
            for dep in found {
                dependencies.entry(dep.signature()).or_insert(dep);
            }
        }

        let build_files = input
            .files_named(is_build_file)
            .cloned()
            .collect::<Vec<_>>();
        let entrypoints = input
            .files_named(|name| ENTRYPOINTS.contains(&name))
            .cloned()
            .collect::<Vec<_>>();

        Ok(Facet::Runtime(RuntimeFacts {
            dependencies: dependencies.into_values().collect(),
            build_files,
            entrypoints,
        }))
    }
}
