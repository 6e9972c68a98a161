use std::collections::BTreeMap;

use regex::{Captures, Regex};

use super::{DetectorInput, Facet, FactDetector, line_at};
use crate::types::{Evidence, FactweaveError, ModelFact, ModelField, Result};

const DJANGO_RELATIONS: &[&str] = &["ForeignKey", "OneToOneField", "ManyToManyField"];

fn group<'t>(caps: &Captures<'t>, idx: usize) -> Option<&'t str> {
    caps.get(idx).map(|m| m.as_str())
}

/// ORM models declared with SQLAlchemy or Django
pub struct ModelDetector {
    class_decl: Regex,
    table_name: Regex,
    django_table: Regex,
    sqlalchemy_attr: Regex,
    django_field: Regex,
    column_type: Regex,
    foreign_key: Regex,
    target: Regex,
}

impl ModelDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            class_decl: FactweaveError::compile(r"(?m)^class\s+(\w+)\s*\(([^)]*)\)\s*:")?,
            table_name: FactweaveError::compile(r#"__tablename__\s*=\s*["'](\w+)["']"#)?,
            django_table: FactweaveError::compile(r#"db_table\s*=\s*["'](\w+)["']"#)?,
            sqlalchemy_attr: FactweaveError::compile(
                r"(?m)^[ \t]+(\w+)\s*(?::\s*Mapped\[([^\]]+)\])?\s*=\s*(?:db\.|sa\.)?(Column|mapped_column|relationship)\((.*)$",
            )?,
            django_field: FactweaveError::compile(r"(?m)^[ \t]+(\w+)\s*=\s*models\.(\w+)\((.*)$")?,
            column_type: FactweaveError::compile(r"^\s*(?:db\.|sa\.)?([A-Z]\w*)")?,
            foreign_key: FactweaveError::compile(r#"ForeignKey\(\s*["']([^"']+)["']"#)?,
            target: FactweaveError::compile(r#"^\s*["']?([\w.]+)["']?"#)?,
        })
    }

    fn first_group(&self, regex: &Regex, text: &str) -> Option<String> {
        regex
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn sqlalchemy(&self, name: &str, body: &str) -> Option<ModelFact> {
        let table = self.first_group(&self.table_name, body);
        let mut fields = Vec::new();
        let mut relationships = Vec::new();

        for caps in self.sqlalchemy_attr.captures_iter(body) {
            let (Some(attr), Some(kind)) = (group(&caps, 1), group(&caps, 3)) else {
                continue;
            };
            let args = group(&caps, 4).unwrap_or("");
            if kind == "relationship" {
                if let Some(target) = self.first_group(&self.target, args) {
                    relationships.push(format!("{}->{}", attr, target));
                }
                continue;
            }
            let field_type = self
                .first_group(&self.column_type, args)
                .filter(|t| t != "ForeignKey")
                .or_else(|| group(&caps, 2).map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            fields.push(ModelField {
                name: attr.to_string(),
                field_type,
                foreign_key: self.first_group(&self.foreign_key, args),
            });
        }

        if table.is_none() && fields.is_empty() {
            return None;
        }
        Some(ModelFact {
            name: name.to_string(),
            table,
            orm: "sqlalchemy".to_string(),
            fields,
            relationships,
            evidence: Vec::new(),
        })
    }

    fn django(&self, name: &str, body: &str) -> ModelFact {
        let mut fields = Vec::new();
        let mut relationships = Vec::new();

        for caps in self.django_field.captures_iter(body) {
            let (Some(attr), Some(kind)) = (group(&caps, 1), group(&caps, 2)) else {
                continue;
            };
            let args = group(&caps, 3).unwrap_or("");
            let mut foreign_key = None;
            if DJANGO_RELATIONS.contains(&kind)
                && let Some(target) = self.first_group(&self.target, args)
            {
                relationships.push(format!("{}->{}", attr, target));
                if kind == "ManyToManyField" {
                    continue;
                }
                foreign_key = Some(target);
            }
            fields.push(ModelField {
                name: attr.to_string(),
                field_type: kind.to_string(),
                foreign_key,
            });
        }

        ModelFact {
            name: name.to_string(),
            table: self.first_group(&self.django_table, body),
            orm: "django".to_string(),
            fields,
            relationships,
            evidence: Vec::new(),
        }
    }

    fn python(&self, path: &str, content: &str) -> Vec<ModelFact> {
        let classes: Vec<_> = self.class_decl.captures_iter(content).collect();
        let mut models = Vec::new();

        for (idx, caps) in classes.iter().enumerate() {
            let (Some(whole), Some(name), Some(bases)) = (caps.get(0), group(caps, 1), group(caps, 2))
            else {
                continue;
            };
            let end = classes
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(content.len());
            let body = &content[whole.end()..end];

            let model = if bases.contains("models.Model") {
                Some(self.django(name, body))
            } else if name != "Base"
                && !bases.contains("DeclarativeBase")
                && (bases.contains("Base") || bases.contains("db.Model"))
            {
                self.sqlalchemy(name, body)
            } else {
                None
            };

            if let Some(mut model) = model {
                model.evidence = vec![Evidence::file(path).with_line(line_at(content, whole.start()))];
                models.push(model);
            }
        }

        models
    }
}

impl FactDetector for ModelDetector {
    fn name(&self) -> &'static str {
        "models"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Facet> {
        let mut models: BTreeMap<String, ModelFact> = BTreeMap::new();

        for path in input.files_with_extension(&["py"]) {
            let content = input.tree.read(path)?;
            if !content.contains("class ") {
                continue;
            }
            for model in self.python(path, &content) {
                models.entry(model.name.clone()).or_insert(model);
            }
        }

        Ok(Facet::Models(models.into_values().collect()))
    }
}
