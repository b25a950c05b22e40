use image::RgbaImage;
use indexmap::IndexMap;
use rand::RngCore;
use tracing::debug;

use synthdoc_core::Template;

use crate::errors::GenerationError;
use crate::generators::RegistrySet;
use crate::model::SampleMetadata;
use crate::text::{Font, TextExtent};

/// A template with every field filled in.
#[derive(Debug, Clone)]
pub struct ComposedSample {
    pub image: RgbaImage,
    pub metadata: SampleMetadata,
    /// Where each field's text landed, keyed like `metadata`.
    pub extents: IndexMap<String, TextExtent>,
}

/// Render generated values onto a copy of the template's base image.
///
/// Fields are visited in declared order so the draw sequence on `rng` is
/// stable. An unknown generator id fails the whole sample.
pub fn compose(
    template: &Template,
    registries: &RegistrySet,
    font: &Font,
    rng: &mut dyn RngCore,
) -> Result<ComposedSample, GenerationError> {
    let mut image = template.image().clone();
    let mut metadata = SampleMetadata::with_capacity(template.field_count());
    let mut extents = IndexMap::with_capacity(template.field_count());

    for (name, field) in template.fields() {
        let value = registries.generate(&field.value_source, rng)?;
        let extent = font.draw(&mut image, &value, &field.bbox);
        debug!(
            template = %template.name(),
            field = %name,
            source = %field.value_source,
            "field rendered"
        );
        metadata.insert(name.to_string(), value);
        extents.insert(name.to_string(), extent);
    }

    Ok(ComposedSample {
        image,
        metadata,
        extents,
    })
}
