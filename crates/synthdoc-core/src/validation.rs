use crate::error::{Error, Result};
use crate::template::Template;

/// Validate internal consistency of a loaded template.
///
/// This checks:
/// - the base image is non-empty
/// - field names are non-empty
/// - every field bbox lies within the base image
/// - every field references a non-empty generator id
pub fn validate_template(template: &Template) -> Result<()> {
    let (width, height) = (template.width(), template.height());
    if width == 0 || height == 0 {
        return Err(Error::invalid_template(
            template.name(),
            "base image has zero area",
        ));
    }

    for (name, field) in template.fields() {
        if name.trim().is_empty() {
            return Err(Error::invalid_template(
                template.name(),
                "field name must not be empty",
            ));
        }

        if !field.bbox.fits_within(width, height) {
            let bbox = field.bbox;
            return Err(Error::invalid_template(
                template.name(),
                format!(
                    "bbox of field '{name}' ({}, {}, {}x{}) exceeds base image {width}x{height}",
                    bbox.x, bbox.y, bbox.width, bbox.height
                ),
            ));
        }

        if field.value_source.generator_id().trim().is_empty() {
            return Err(Error::invalid_template(
                template.name(),
                format!("field '{name}' has an empty generator id"),
            ));
        }
    }

    Ok(())
}
