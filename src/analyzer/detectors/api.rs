use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use super::{DetectorInput, Facet, FactDetector, file_name, line_at};
use crate::types::{ApiFacts, EndpointFact, Evidence, FactweaveError, Result};

/// Join a router prefix and a route path into one absolute path
fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim();
    let joined = if path.is_empty() || path == "/" {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else if path.starts_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    };
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

/// HTTP endpoints declared with FastAPI, Flask, Express or Django routing
pub struct ApiDetector {
    method_decorator: Regex,
    flask_route: Regex,
    router_prefix: Regex,
    prefix_arg: Regex,
    handler: Regex,
    express_route: Regex,
    django_path: Regex,
    quoted: Regex,
}

impl ApiDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            method_decorator: FactweaveError::compile(
                r#"@(\w+)\.(get|post|put|delete|patch)\(\s*["']([^"']*)["']"#,
            )?,
            flask_route: FactweaveError::compile(
                r#"@(\w+)\.route\(\s*["']([^"']*)["']([^)]*)\)"#,
            )?,
            router_prefix: FactweaveError::compile(r"(\w+)\s*=\s*(?:APIRouter|Blueprint)\(([^)]*)\)")?,
            prefix_arg: FactweaveError::compile(r#"(?:prefix|url_prefix)\s*=\s*["']([^"']*)["']"#)?,
            handler: FactweaveError::compile(r"(?:async\s+)?def\s+(\w+)")?,
            express_route: FactweaveError::compile(
                r#"\b(app|router)\.(get|post|put|delete|patch)\(\s*["'`]([^"'`]+)["'`]"#,
            )?,
            django_path: FactweaveError::compile(
                r#"\b(?:re_)?path\(\s*r?["']([^"']*)["']\s*,\s*([\w.]+)"#,
            )?,
            quoted: FactweaveError::compile(r#"["'](\w+)["']"#)?,
        })
    }

    /// Prefixes declared per router variable in one file
    fn prefixes(&self, content: &str) -> HashMap<String, String> {
        self.router_prefix
            .captures_iter(content)
            .filter_map(|caps| {
                let var = caps.get(1)?.as_str().to_string();
                let prefix = self
                    .prefix_arg
                    .captures(caps.get(2)?.as_str())
                    .and_then(|p| p.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                Some((var, prefix))
            })
            .collect()
    }

    fn handler_after(&self, content: &str, offset: usize) -> Option<String> {
        self.handler
            .captures(&content[offset..])
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn python(&self, path: &str, content: &str) -> Vec<EndpointFact> {
        let framework = if content.contains("fastapi") {
            "fastapi"
        } else if content.contains("flask") {
            "flask"
        } else {
            return Vec::new();
        };
        let prefixes = self.prefixes(content);
        let prefix_for = |var: &str| prefixes.get(var).map(String::as_str).unwrap_or("");
        let mut endpoints = Vec::new();

        for caps in self.method_decorator.captures_iter(content) {
            let (Some(whole), Some(var), Some(method), Some(route)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            endpoints.push(EndpointFact {
                method: method.as_str().to_uppercase(),
                path: join_path(prefix_for(var.as_str()), route.as_str()),
                handler: self.handler_after(content, whole.end()),
                framework: framework.to_string(),
                evidence: vec![Evidence::file(path).with_line(line_at(content, whole.start()))],
            });
        }

        for caps in self.flask_route.captures_iter(content) {
            let (Some(whole), Some(var), Some(route)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let args = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            let mut methods: Vec<String> = match args.find("methods") {
                Some(idx) => self
                    .quoted
                    .captures_iter(&args[idx..])
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_uppercase())
                    .collect(),
                None => Vec::new(),
            };
            if methods.is_empty() {
                methods.push("GET".to_string());
            }
            let handler = self.handler_after(content, whole.end());
            let line = line_at(content, whole.start());
            for method in methods {
                endpoints.push(EndpointFact {
                    method,
                    path: join_path(prefix_for(var.as_str()), route.as_str()),
                    handler: handler.clone(),
                    framework: framework.to_string(),
                    evidence: vec![Evidence::file(path).with_line(line)],
                });
            }
        }

        endpoints
    }

    fn express(&self, path: &str, content: &str) -> Vec<EndpointFact> {
        if !content.contains("express") && !content.contains("Router") {
            return Vec::new();
        }
        self.express_route
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(EndpointFact {
                    method: caps.get(2)?.as_str().to_uppercase(),
                    path: join_path("", caps.get(3)?.as_str()),
                    handler: None,
                    framework: "express".to_string(),
                    evidence: vec![
                        Evidence::file(path).with_line(line_at(content, whole.start())),
                    ],
                })
            })
            .collect()
    }

    fn django(&self, path: &str, content: &str) -> Vec<EndpointFact> {
        self.django_path
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let view = caps.get(2)?.as_str();
                // include() delegates to another urls module
                if view == "include" {
                    return None;
                }
                let route = caps.get(1)?.as_str().trim_start_matches('^').trim_end_matches('$');
                Some(EndpointFact {
                    method: "ANY".to_string(),
                    path: join_path("", route),
                    handler: Some(view.rsplit('.').next().unwrap_or(view).to_string()),
                    framework: "django".to_string(),
                    evidence: vec![
                        Evidence::file(path).with_line(line_at(content, whole.start())),
                    ],
                })
            })
            .collect()
    }
}

impl FactDetector for ApiDetector {
    fn name(&self) -> &'static str {
        "api"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        let mut endpoints: BTreeMap<(String, String), EndpointFact> = BTreeMap::new();

        for path in input.files_with_extension(&["py", "js", "ts", "mjs", "cjs"]) {
            let content = input.tree.read(path)?;
            let found = if file_name(path) == "urls.py" {
                self.django(path, &content)
            } else if path.ends_with(".py") {
                self.python(path, &content)
            } else {
                self.express(path, &content)
            };
            for endpoint in found {
                endpoints
                    .entry((endpoint.path.clone(), endpoint.method.clone()))
                    .or_insert(endpoint);
            }
        }

        let endpoints: Vec<EndpointFact> = endpoints.into_values().collect();
        Ok(Facet::Api(ApiFacts {
            total_count: endpoints.len(),
            endpoints,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MemorySourceTree;
    use crate::analyzer::source_tree::SourceTree;
    use crate::types::{Facts, RepoInfo};

    fn detect(tree: &MemorySourceTree) -> ApiFacts {
        let files = tree.files().unwrap();
        let facts = Facts::empty(RepoInfo::new("u", "c"));
        let input = DetectorInput {
            tree,
            files: &files,
            facts: &facts,
        };
        match ApiDetector::new().unwrap().detect(&input).unwrap() {
            Facet::Api(v) => v,
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/users", "/"), "/users");
        assert_eq!(join_path("/users/", "{id}"), "/users/{id}");
        assert_eq!(join_path("", "items"), "/items");
        assert_eq!(join_path("", ""), "/");
    }

    #[test]
    fn test_fastapi_router_prefix_and_handler() {
        let tree = MemorySourceTree::new().with_file(
            "app/routers/users.py",
            "from fastapi import APIRouter\n\nrouter = APIRouter(prefix=\"/users\", tags=[\"u\"])\n\n@router.get(\"/{user_id}\")\nasync def read_user(user_id: int):\n    pass\n\n@router.post(\"/\")\ndef create_user():\n    pass\n",
        );
        let api = detect(&tree);
        assert_eq!(api.total_count, 2);
        let post = &api.endpoints[0];
        assert_eq!(post.signature(), "POST /users");
        assert_eq!(post.handler.as_deref(), Some("create_user"));
        let get = &api.endpoints[1];
        assert_eq!(get.signature(), "GET /users/{user_id}");
        assert_eq!(get.handler.as_deref(), Some("read_user"));
        assert_eq!(get.framework, "fastapi");
        assert_eq!(get.evidence[0].lines, vec![5]);
    }

    #[test]
    fn test_flask_route_methods() {
        let tree = MemorySourceTree::new().with_file(
            "app.py",
            "from flask import Flask\napp = Flask(__name__)\n\n@app.route(\"/login\", methods=[\"GET\", \"POST\"])\ndef login():\n    pass\n",
        );
        let api = detect(&tree);
        let sigs: Vec<_> = api.endpoints.iter().map(EndpointFact::signature).collect();
        assert_eq!(sigs, vec!["GET /login", "POST /login"]);
    }

    #[test]
    fn test_express_and_django() {
        let tree = MemorySourceTree::new()
            .with_file(
                "server/index.js",
                "const express = require('express');\nconst app = express();\napp.get('/health', (req, res) => res.send('ok'));\n",
            )
            .with_file(
                "shop/urls.py",
                "urlpatterns = [\n    path('orders/', views.order_list),\n    path('api/', include('api.urls')),\n]\n",
            );
        let api = detect(&tree);
        let sigs: Vec<_> = api.endpoints.iter().map(EndpointFact::signature).collect();
        assert_eq!(sigs, vec!["GET /health", "ANY /orders/"]);
        assert_eq!(api.endpoints[1].handler.as_deref(), Some("order_list"));
    }

    #[test]
    fn test_duplicate_endpoints_collapse() {
        let body = "from fastapi import FastAPI\napp = FastAPI()\n@app.get(\"/ping\")\ndef ping():\n    pass\n";
        let tree = MemorySourceTree::new()
            .with_file("a.py", body)
            .with_file("b.py", body);
        let api = detect(&tree);
        assert_eq!(api.total_count, 1);
        assert_eq!(api.endpoints[0].evidence[0].path, "a.py");
    }
}
