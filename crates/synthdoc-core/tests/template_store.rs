use std::fs;
use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use synthdoc_core::{Error, TemplateStore, ValueSource};

const METADATA: &str = r#"{
  "invoice.png": {
    "fields": {
      "customer": {"bbox": {"x": 10, "y": 10, "width": 100, "height": 20},
                   "metatype": {"source": "faker", "value": "name"}},
      "issued": {"bbox": {"x": 10, "y": 40, "width": 100, "height": 20},
                 "metatype": {"source": "builtin", "value": "past_date"}}
    }
  },
  "missing.png": {
    "fields": {
      "number": {"bbox": {"x": 0, "y": 0, "width": 10, "height": 10},
                 "metatype": {"source": "custom", "value": "passport_number"}}
    }
  }
}"#;

fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("synthdoc_core_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_fixture(dir: &PathBuf) -> PathBuf {
    RgbaImage::from_pixel(200, 80, Rgba([250, 250, 250, 255]))
        .save(dir.join("invoice.png"))
        .expect("write base image");
    let metadata_path = dir.join("metadata.json");
    fs::write(&metadata_path, METADATA).expect("write metadata");
    metadata_path
}

#[test]
fn strict_load_fails_on_missing_base_image() {
    let dir = temp_dir("strict");
    let metadata_path = write_fixture(&dir);

    let result = TemplateStore::load(&metadata_path, &dir);
    match result {
        Err(Error::TemplateLoad { template, .. }) => assert_eq!(template, "missing.png"),
        other => panic!("expected TemplateLoad error, got {other:?}"),
    }
}

#[test]
fn lenient_load_keeps_loadable_templates() {
    let dir = temp_dir("lenient");
    let metadata_path = write_fixture(&dir);

    let loaded = TemplateStore::load_lenient(&metadata_path, &dir).expect("lenient load");
    let names: Vec<&str> = loaded.store.iter().map(|template| template.name()).collect();
    assert_eq!(names, vec!["invoice.png"]);
    assert_eq!(loaded.failures.len(), 1);
    assert_eq!(loaded.failures[0].template(), Some("missing.png"));

    let template = loaded.store.by_name("invoice.png").expect("invoice template");
    assert_eq!((template.width(), template.height()), (200, 80));
    let fields: Vec<(&str, &ValueSource)> = template
        .fields()
        .map(|(name, spec)| (name, &spec.value_source))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("customer", &ValueSource::builtin("name")),
            ("issued", &ValueSource::builtin("past_date")),
        ]
    );
}

#[test]
fn missing_metadata_file_is_a_template_load_error() {
    let dir = temp_dir("no_metadata");
    let result = TemplateStore::load(&dir.join("nope.json"), &dir);
    assert!(matches!(result, Err(Error::TemplateLoad { .. })));
}

#[test]
fn empty_store_is_rejected() {
    assert!(matches!(
        TemplateStore::from_templates(Vec::new()),
        Err(Error::TemplateLoad { .. })
    ));
}

#[test]
fn out_of_bounds_bbox_fails_the_load() {
    let dir = temp_dir("out_of_bounds");
    RgbaImage::from_pixel(50, 30, Rgba([255, 255, 255, 255]))
        .save(dir.join("stub.png"))
        .expect("write base image");
    let metadata_path = dir.join("metadata.json");
    fs::write(
        &metadata_path,
        r#"{"stub.png": {"fields": {"total": {
            "bbox": {"x": 40, "y": 0, "width": 20, "height": 10},
            "metatype": {"source": "builtin", "value": "pyint"}}}}}"#,
    )
    .expect("write metadata");

    match TemplateStore::load(&metadata_path, &dir) {
        Err(Error::TemplateLoad { template, reason }) => {
            assert_eq!(template, "stub.png");
            assert!(reason.contains("total"), "{reason}");
        }
        other => panic!("expected TemplateLoad error, got {other:?}"),
    }
}
