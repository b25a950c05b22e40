use image::{Rgba, RgbaImage};
use indexmap::IndexMap;

use synthdoc_core::{BBox, FieldSpec, Template, TemplateStore, ValueSource, ValueSourceKind};
use synthdoc_generate::background::BackgroundKind;
use synthdoc_generate::{
    BackgroundOptions, EmptyCorpus, Font, GenerateOptions, MemoryCorpus, RegistrySet,
    SampleRenderer,
};

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn every_source(registries: &RegistrySet) -> Vec<ValueSource> {
    let mut sources = Vec::new();
    for id in registries.registry(ValueSourceKind::Builtin).ids() {
        sources.push(ValueSource::builtin(id));
    }
    for id in registries.registry(ValueSourceKind::Custom).ids() {
        sources.push(ValueSource::custom(id));
    }
    sources
}

/// One narrow field per generator, stacked vertically.
fn catalog_template(sources: &[ValueSource]) -> Template {
    let mut fields = IndexMap::new();
    for (row, source) in sources.iter().enumerate() {
        fields.insert(
            format!("field_{row}"),
            FieldSpec {
                bbox: BBox::new(12, 8 + row as u32 * 26, 90, 18),
                value_source: source.clone(),
            },
        );
    }
    let height = 16 + sources.len() as u32 * 26;
    Template::new("catalog.png", RgbaImage::from_pixel(140, height, PAPER), fields)
}

fn inside_any(x: u32, y: u32, boxes: &[BBox]) -> bool {
    boxes.iter().any(|bbox| {
        x >= bbox.x && u64::from(x) < bbox.right() && y >= bbox.y && u64::from(y) < bbox.bottom()
    })
}

#[test]
fn text_stays_inside_field_boxes_for_every_generator() {
    let options = GenerateOptions {
        seed: 11,
        background: BackgroundOptions {
            probability: 0.0,
            ..BackgroundOptions::default()
        },
        ..GenerateOptions::default()
    };
    let registries = RegistrySet::new(options.reference_date).expect("registries");
    let sources = every_source(&registries);
    let template = catalog_template(&sources);
    let boxes: Vec<BBox> = template.fields().map(|(_, field)| field.bbox).collect();
    let templates = TemplateStore::from_templates(vec![template]).expect("store");

    for font in [Font::builtin(1), Font::builtin(2), Font::builtin(4)] {
        let renderer = SampleRenderer::new(&templates, &registries, &font, &EmptyCorpus, &options);
        for index in 0..3 {
            let sample = renderer.render(index).expect("render");
            assert!(sample.placement.is_none());
            assert_eq!(sample.metadata.len(), sources.len());

            for ((name, extent), bbox) in sample.extents.iter().zip(&boxes) {
                assert!(extent.x >= bbox.x && extent.y >= bbox.y, "{name} starts outside");
                assert!(
                    u64::from(extent.x) + u64::from(extent.width) <= bbox.right()
                        && u64::from(extent.y) + u64::from(extent.height) <= bbox.bottom(),
                    "{name} extends past its box"
                );
            }

            for (x, y, pixel) in sample.image.enumerate_pixels() {
                if !inside_any(x, y, &boxes) {
                    assert_eq!(*pixel, PAPER, "ink outside every box at ({x}, {y})");
                }
            }
        }
    }
}

#[test]
fn placed_documents_stay_inside_the_background() {
    let mut fields = IndexMap::new();
    fields.insert(
        "name".to_string(),
        FieldSpec {
            bbox: BBox::new(10, 10, 160, 20),
            value_source: ValueSource::builtin("name"),
        },
    );
    let templates = TemplateStore::from_templates(vec![Template::new(
        "card.png",
        RgbaImage::from_pixel(240, 150, PAPER),
        fields,
    )])
    .expect("store");

    let options = GenerateOptions {
        background: BackgroundOptions {
            probability: 1.0,
            flat_ratio: 0.5,
            min_canvas: 300,
            max_canvas: 700,
            max_rotation_degrees: 45.0,
        },
        ..GenerateOptions::default()
    };
    let registries = RegistrySet::new(options.reference_date).expect("registries");
    let font = Font::default();
    let corpus = MemoryCorpus::new(vec![
        RgbaImage::from_pixel(320, 240, Rgba([40, 80, 120, 255])),
        RgbaImage::from_pixel(640, 480, Rgba([120, 80, 40, 255])),
    ]);

    let mut flat = 0;
    let mut photo = 0;
    for seed in 0..24 {
        let options = GenerateOptions {
            seed,
            ..options.clone()
        };
        let renderer = SampleRenderer::new(&templates, &registries, &font, &corpus, &options);
        let sample = renderer.render(0).expect("render");
        let placement = sample.placement.expect("background always applied");

        assert!(placement.is_contained(), "seed {seed}: {placement:?}");
        assert_eq!(
            sample.image.dimensions(),
            (placement.background_width, placement.background_height)
        );
        assert!(placement.angle_degrees.abs() <= 45.0);
        match placement.kind {
            BackgroundKind::Flat { .. } => flat += 1,
            BackgroundKind::Photo { index } => {
                assert!(index < 2);
                photo += 1;
            }
        }
    }
    assert!(flat > 0 && photo > 0);
}
