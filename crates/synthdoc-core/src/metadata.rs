use std::path::Path;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::template::FieldSpec;

/// Template metadata document: base-image basename -> template entry.
///
/// Key order is preserved so template selection stays deterministic for a
/// given document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MetadataDocument {
    pub templates: IndexMap<String, TemplateEntry>,
}

/// Field schema of a single template, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateEntry {
    pub fields: IndexMap<String, FieldSpec>,
}

impl MetadataDocument {
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

pub fn parse_metadata(contents: &str) -> Result<MetadataDocument> {
    serde_json::from_str(contents).map_err(Error::from)
}

/// Read and parse a metadata document from disk.
pub fn load_metadata(path: &Path) -> Result<MetadataDocument> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        Error::template_load(path.display().to_string(), format!("metadata unreadable: {err}"))
    })?;
    serde_json::from_str(&contents).map_err(|err| {
        Error::template_load(path.display().to_string(), format!("metadata invalid: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ValueSource;

    #[test]
    fn parses_faker_alias_and_keeps_field_order() {
        let doc = parse_metadata(
            r#"{
              "passport.jpg": {
                "fields": {
                  "surname": {"bbox": {"x": 1, "y": 2, "width": 30, "height": 12},
                              "metatype": {"source": "faker", "value": "last_name"}},
                  "number": {"bbox": {"x": 5, "y": 20, "width": 40, "height": 12},
                             "metatype": {"source": "custom", "value": "passport_number"}},
                  "expiry": {"bbox": {"x": 5, "y": 40, "width": 40, "height": 12},
                             "metatype": {"source": "builtin", "value": "future_date"}}
                }
              }
            }"#,
        )
        .expect("parse metadata");

        let entry = &doc.templates["passport.jpg"];
        let names: Vec<&str> = entry.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["surname", "number", "expiry"]);
        assert_eq!(
            entry.fields["surname"].value_source,
            ValueSource::builtin("last_name")
        );
        assert_eq!(
            entry.fields["number"].value_source,
            ValueSource::custom("passport_number")
        );
    }

    #[test]
    fn rejects_unknown_source_tag() {
        let result = parse_metadata(
            r#"{"t.png": {"fields": {"a": {"bbox": {"x": 0, "y": 0, "width": 1, "height": 1},
                "metatype": {"source": "oracle", "value": "name"}}}}}"#,
        );
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
