use std::collections::BTreeMap;

use regex::Regex;

use super::{DetectorInput, Facet, FactDetector, file_name, line_at};
use crate::types::{Evidence, FactweaveError, Result, RouteFact};

/// Base name without extension of an import specifier
fn import_basename(spec: &str) -> String {
    let name = file_name(spec);
    name.split('.').next().unwrap_or(name).to_string()
}

/// Client-side routes from Vue Router tables and React Router elements
pub struct FrontendRouteDetector {
    vue_path: Regex,
    vue_name: Regex,
    vue_component: Regex,
    vue_lazy_component: Regex,
    vue_auth: Regex,
    react_route: Regex,
    react_path: Regex,
    react_component: Regex,
}

impl FrontendRouteDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            vue_path: FactweaveError::compile(r#"\bpath\s*:\s*['"`]([^'"`]+)['"`]"#)?,
            vue_name: FactweaveError::compile(r#"\bname\s*:\s*['"`]([^'"`]+)['"`]"#)?,
            vue_component: FactweaveError::compile(r"\bcomponent\s*:\s*([A-Za-z_]\w*)\s*[,}\n]")?,
            vue_lazy_component: FactweaveError::compile(
                r#"\bcomponent\s*:\s*\(\)\s*=>\s*import\(\s*(?:/\*.*?\*/\s*)?['"`]([^'"`]+)['"`]"#,
            )?,
            vue_auth: FactweaveError::compile(r"\brequiresAuth\s*:\s*true")?,
            react_route: FactweaveError::compile(r"<Route\b([^>]*)>")?,
            react_path: FactweaveError::compile(r#"\bpath\s*=\s*["']([^"']+)["']"#)?,
            react_component: FactweaveError::compile(
                r"\b(?:element\s*=\s*\{\s*<\s*|component\s*=\s*\{\s*)([A-Za-z_]\w*)",
            )?,
        })
    }

    fn vue(&self, path: &str, content: &str) -> Vec<RouteFact> {
        let starts: Vec<_> = self.vue_path.captures_iter(content).collect();
        let mut routes = Vec::new();

        for (idx, caps) in starts.iter().enumerate() {
            let (Some(whole), Some(route)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // Route object body runs until the next `path:` key
            let end = starts
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(content.len());
            let body = &content[whole.end()..end];

            let name = self
                .vue_name
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            let component = self
                .vue_lazy_component
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| import_basename(m.as_str()))
                .or_else(|| {
                    self.vue_component
                        .captures(body)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().to_string())
                });

            routes.push(RouteFact {
                path: route.as_str().to_string(),
                name,
                component,
                auth_required: self.vue_auth.is_match(body),
                evidence: vec![Evidence::file(path).with_line(line_at(content, whole.start()))],
            });
        }

        routes
    }

    fn react(&self, path: &str, content: &str) -> Vec<RouteFact> {
        self.react_route
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let attrs = caps.get(1)?.as_str();
                let route = self.react_path.captures(attrs)?.get(1)?.as_str();
                let component = self
                    .react_component
                    .captures(attrs)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string());
                let lowered = attrs.to_lowercase();
                Some(RouteFact {
                    path: route.to_string(),
                    name: None,
                    auth_required: ["auth", "private", "protected"]
                        .iter()
                        .any(|marker| lowered.contains(marker)),
                    component,
                    evidence: vec![
                        Evidence::file(path).with_line(line_at(content, whole.start())),
                    ],
                })
            })
            .collect()
    }
}

impl FactDetector for FrontendRouteDetector {
    fn name(&self) -> &'static str {
        "frontend_routes"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        let mut routes: BTreeMap<String, RouteFact> = BTreeMap::new();

        for path in input.files_with_extension(&["js", "ts", "jsx", "tsx", "mjs"]) {
            let content = input.tree.read(path)?;
            let found = if content.contains("<Route") {
                self.react(path, &content)
            } else if content.contains("createRouter")
                || content.contains("VueRouter")
                || content.contains("RouteRecordRaw")
            {
                self.vue(path, &content)
            } else {
                continue;
            };
            for route in found {
                routes.entry(route.path.clone()).or_insert(route);
            }
        }

        Ok(Facet::FrontendRoutes(routes.into_values().collect()))
    }
}
