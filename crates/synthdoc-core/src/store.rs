use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metadata::{MetadataDocument, TemplateEntry, load_metadata};
use crate::template::Template;
use crate::validation::validate_template;

/// Read-only set of loaded templates.
///
/// Built once at startup and shared by reference with every worker.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: Vec<Template>,
}

/// Result of a lenient load: the templates that loaded plus the failures.
#[derive(Debug)]
pub struct LoadedTemplates {
    pub store: TemplateStore,
    pub failures: Vec<Error>,
}

impl TemplateStore {
    /// Build a store from already constructed templates, validating each one.
    pub fn from_templates(templates: Vec<Template>) -> Result<Self> {
        if templates.is_empty() {
            return Err(Error::template_load("<store>", "no templates configured"));
        }
        for template in &templates {
            validate_template(template)?;
        }
        Ok(Self { templates })
    }

    /// Load every template of the metadata file, failing on the first error.
    pub fn load(metadata_path: &Path, assets_dir: &Path) -> Result<Self> {
        let document = load_metadata(metadata_path)?;
        Self::from_document(&document, assets_dir)
    }

    /// Load every template of a parsed document, failing on the first error.
    pub fn from_document(document: &MetadataDocument, assets_dir: &Path) -> Result<Self> {
        let mut templates = Vec::with_capacity(document.templates.len());
        for (name, entry) in &document.templates {
            templates.push(load_template(name, entry, assets_dir)?);
        }
        Self::from_templates(templates)
    }

    /// Load the templates that can be loaded and report the rest.
    ///
    /// Fails only when no template at all could be loaded.
    pub fn load_lenient(metadata_path: &Path, assets_dir: &Path) -> Result<LoadedTemplates> {
        let document = load_metadata(metadata_path)?;
        let mut templates = Vec::with_capacity(document.templates.len());
        let mut failures = Vec::new();
        for (name, entry) in &document.templates {
            match load_template(name, entry, assets_dir) {
                Ok(template) => templates.push(template),
                Err(err) => {
                    warn!(template = %name, error = %err, "template skipped");
                    failures.push(err);
                }
            }
        }
        let store = Self::from_templates(templates)?;
        Ok(LoadedTemplates { store, failures })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }
}

fn load_template(name: &str, entry: &TemplateEntry, assets_dir: &Path) -> Result<Template> {
    let path = assets_dir.join(name);
    let image = image::open(&path)
        .map_err(|err| Error::template_load(name, format!("{}: {err}", path.display())))?
        .to_rgba8();
    debug!(
        template = %name,
        width = image.width(),
        height = image.height(),
        fields = entry.fields.len(),
        "template loaded"
    );
    let template = Template::new(name, image, entry.fields.clone());
    validate_template(&template).map_err(|err| match err {
        Error::InvalidTemplate { template, reason } => Error::TemplateLoad { template, reason },
        other => other,
    })?;
    Ok(template)
}
