use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use indexmap::IndexMap;

use synthdoc_core::{BBox, FieldSpec, Template, TemplateStore, ValueSource, ValueSourceKind};
use synthdoc_generate::{
    BatchEngine, BatchReport, EmptyCorpus, FailurePolicy, GenerateOptions, GenerationError,
    ManifestEntry, ScanDegrader, TemplateSelection,
};

fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("synthdoc_{label}_{}", uuid::Uuid::new_v4()))
}

/// Five templates; with `broken`, the second field of `form_2.png` names an
/// unknown generator.
fn store(broken: bool) -> TemplateStore {
    let templates = (0..5)
        .map(|number| {
            let second = if broken && number == 2 {
                ValueSource::builtin("no_such_generator")
            } else {
                ValueSource::builtin("date_of_birth")
            };
            let mut fields = IndexMap::new();
            fields.insert(
                "holder".to_string(),
                FieldSpec {
                    bbox: BBox::new(10, 10, 180, 20),
                    value_source: ValueSource::builtin("name"),
                },
            );
            fields.insert(
                "born".to_string(),
                FieldSpec {
                    bbox: BBox::new(10, 40, 180, 20),
                    value_source: second,
                },
            );
            fields.insert(
                "id".to_string(),
                FieldSpec {
                    bbox: BBox::new(10, 70, 180, 20),
                    value_source: ValueSource::custom("passport_number"),
                },
            );
            Template::new(
                format!("form_{number}.png"),
                RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255])),
                fields,
            )
        })
        .collect();
    TemplateStore::from_templates(templates).expect("store")
}

fn options(policy: FailurePolicy, workers: usize) -> GenerateOptions {
    GenerateOptions {
        seed: 5,
        generation_workers: workers,
        failure_policy: policy,
        template_selection: TemplateSelection::RoundRobin,
        ..GenerateOptions::default()
    }
}

fn read_report(run_dir: &Path) -> BatchReport {
    let text = std::fs::read_to_string(run_dir.join("generation_report.json")).expect("report");
    serde_json::from_str(&text).expect("parse report")
}

fn read_manifest(run_dir: &Path) -> Vec<ManifestEntry> {
    let text = std::fs::read_to_string(run_dir.join("metadata.json")).expect("manifest");
    serde_json::from_str(&text).expect("parse manifest")
}

#[test]
fn skip_policy_keeps_the_other_samples() {
    let run_dir = temp_dir("partial_skip");
    let result = BatchEngine::new(options(FailurePolicy::Skip, 3))
        .run_in(
            &run_dir,
            "skip",
            &store(true),
            &EmptyCorpus,
            &ScanDegrader::default(),
            5,
        )
        .expect("batch succeeds with one failed sample");

    let indices: Vec<u64> = result.manifest.iter().map(|entry| entry.index).collect();
    assert_eq!(indices, vec![0, 1, 3, 4]);
    assert_eq!(read_manifest(&run_dir), result.manifest);
    assert!(!run_dir.join("sample_2.png").exists());
    assert!(!run_dir.join("sample_2_metadata.json").exists());

    let report = read_report(&run_dir);
    assert_eq!(report.succeeded, vec![0, 1, 3, 4]);
    assert_eq!(report.failed_indices(), vec![2]);
    assert_eq!(report.failed[0].code, "unknown_generator");
    assert_eq!(report.failed[0].template.as_deref(), Some("form_2.png"));
    assert!(!report.aborted);
    assert_eq!(
        report.unresolved_references,
        vec!["form_2.png/born -> builtin:no_such_generator".to_string()]
    );
}

#[test]
fn failed_sample_does_not_disturb_its_neighbours() {
    let broken_dir = temp_dir("partial_broken");
    BatchEngine::new(options(FailurePolicy::Skip, 2))
        .run_in(
            &broken_dir,
            "broken",
            &store(true),
            &EmptyCorpus,
            &ScanDegrader::default(),
            5,
        )
        .expect("broken batch");

    let clean_dir = temp_dir("partial_clean");
    BatchEngine::new(options(FailurePolicy::Skip, 2))
        .run_in(
            &clean_dir,
            "clean",
            &store(false),
            &EmptyCorpus,
            &ScanDegrader::default(),
            5,
        )
        .expect("clean batch");

    for index in [0, 1, 3, 4] {
        for name in [
            format!("sample_{index}.png"),
            format!("sample_{index}_metadata.json"),
        ] {
            assert_eq!(
                std::fs::read(broken_dir.join(&name)).expect("broken file"),
                std::fs::read(clean_dir.join(&name)).expect("clean file"),
                "{name} differs"
            );
        }
    }
}

#[test]
fn metadata_write_failure_leaves_no_orphan_image() {
    let run_dir = temp_dir("partial_io");
    // A directory where the metadata file belongs makes its rename fail.
    std::fs::create_dir_all(run_dir.join("sample_1_metadata.json")).expect("blocking dir");

    let result = BatchEngine::new(options(FailurePolicy::Skip, 2))
        .run_in(
            &run_dir,
            "io",
            &store(false),
            &EmptyCorpus,
            &ScanDegrader::default(),
            3,
        )
        .expect("batch succeeds with one failed sample");

    let indices: Vec<u64> = result.manifest.iter().map(|entry| entry.index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert!(!run_dir.join("sample_1.png").exists());
    assert!(run_dir.join("sample_0.png").exists());
    assert!(run_dir.join("sample_2.png").exists());

    let report = read_report(&run_dir);
    assert_eq!(report.failed_indices(), vec![1]);
    assert_eq!(report.failed[0].template.as_deref(), Some("form_1.png"));
}

#[test]
fn abort_policy_stops_at_the_failing_index() {
    let run_dir = temp_dir("partial_abort");
    let err = BatchEngine::new(options(FailurePolicy::Abort, 3))
        .run_in(
            &run_dir,
            "abort",
            &store(true),
            &EmptyCorpus,
            &ScanDegrader::default(),
            5,
        )
        .expect_err("abort policy fails the batch");

    match err {
        GenerationError::SampleFailed { index, source } => {
            assert_eq!(index, 2);
            match *source {
                GenerationError::UnknownGenerator { kind, ref id } => {
                    assert_eq!(kind, ValueSourceKind::Builtin);
                    assert_eq!(id, "no_such_generator");
                }
                ref other => panic!("unexpected source error: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }

    let report = read_report(&run_dir);
    assert!(report.aborted);
    assert_eq!(report.succeeded, vec![0, 1]);
    assert_eq!(report.failed_indices(), vec![2]);
    let indices: Vec<u64> = read_manifest(&run_dir)
        .iter()
        .map(|entry| entry.index)
        .collect();
    assert_eq!(indices, vec![0, 1]);
    for index in [3, 4] {
        assert!(!run_dir.join(format!("sample_{index}.png")).exists());
    }
}

#[test]
fn batch_where_every_sample_fails_reports_failure() {
    let mut fields = IndexMap::new();
    fields.insert(
        "broken".to_string(),
        FieldSpec {
            bbox: BBox::new(0, 0, 50, 20),
            value_source: ValueSource::custom("missing"),
        },
    );
    let templates = TemplateStore::from_templates(vec![Template::new(
        "only.png",
        RgbaImage::from_pixel(100, 40, Rgba([255, 255, 255, 255])),
        fields,
    )])
    .expect("store");

    let run_dir = temp_dir("partial_all_failed");
    let err = BatchEngine::new(options(FailurePolicy::Skip, 1))
        .run_in(
            &run_dir,
            "all_failed",
            &templates,
            &EmptyCorpus,
            &ScanDegrader::default(),
            3,
        )
        .expect_err("nothing succeeded");

    match err {
        GenerationError::Failed(report) => {
            assert_eq!(report.failed_indices(), vec![0, 1, 2]);
            assert!(report.succeeded.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(run_dir.join("generation_report.json").exists());
    assert!(read_manifest(&run_dir).is_empty());
}
