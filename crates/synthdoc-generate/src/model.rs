use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;

/// Field name -> generated value for one sample, in template field order.
pub type SampleMetadata = IndexMap<String, String>;

/// What the orchestrator does when a single sample fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch at the first failing index.
    Abort,
    /// Record the failure and keep generating the remaining samples.
    Skip,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(GenerationError::InvalidOptions(format!(
                "unknown failure policy '{other}' (expected 'abort' or 'skip')"
            ))),
        }
    }
}

/// How each sample picks its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSelection {
    /// Uniform draw from the sample's random stream.
    #[default]
    Random,
    /// Template `index % len`, in store order.
    RoundRobin,
}

/// Background placement knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackgroundOptions {
    /// Probability that a sample is placed on a background at all.
    pub probability: f64,
    /// Probability of a flat grey canvas instead of a corpus photo.
    pub flat_ratio: f64,
    /// Inclusive bounds of the flat canvas side length.
    pub min_canvas: u32,
    pub max_canvas: u32,
    /// Rotation is drawn uniformly from `[-max_rotation_degrees, max_rotation_degrees]`.
    pub max_rotation_degrees: f32,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            probability: 1.0,
            flat_ratio: 0.5,
            min_canvas: 700,
            max_canvas: 1500,
            max_rotation_degrees: 45.0,
        }
    }
}

/// Text rendering knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextOptions {
    /// Integer scale of the builtin bitmap face.
    pub font_scale: u32,
    /// Optional TrueType font replacing the builtin face.
    pub font_path: Option<PathBuf>,
    /// Pixel height used with `font_path`.
    pub font_px: f32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font_scale: 2,
            font_path: None,
            font_px: 16.0,
        }
    }
}

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerateOptions {
    /// Directory where run artifacts are written.
    pub out_dir: PathBuf,
    /// Batch seed mixed into every per-sample seed.
    pub seed: u64,
    /// Worker threads for the composition phase.
    pub generation_workers: usize,
    /// Worker threads for the augmentation phase (default: cores - 1).
    pub augment_workers: Option<usize>,
    /// Run the augmentation phase after generation.
    pub augment: bool,
    pub failure_policy: FailurePolicy,
    pub template_selection: TemplateSelection,
    /// Anchor for relative dates, so values never depend on the wall clock.
    pub reference_date: NaiveDate,
    pub background: BackgroundOptions,
    pub text: TextOptions,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            seed: 0,
            generation_workers: 1,
            augment_workers: None,
            augment: false,
            failure_policy: FailurePolicy::Skip,
            template_selection: TemplateSelection::Random,
            reference_date: NaiveDate::from_ymd_opt(2024, 6, 17).unwrap_or_default(),
            background: BackgroundOptions::default(),
            text: TextOptions::default(),
        }
    }
}

impl GenerateOptions {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.generation_workers == 0 {
            return Err(GenerationError::InvalidOptions(
                "generation_workers must be >= 1".to_string(),
            ));
        }
        if self.augment_workers == Some(0) {
            return Err(GenerationError::InvalidOptions(
                "augment_workers must be >= 1 when set".to_string(),
            ));
        }
        let background = &self.background;
        for (name, value) in [
            ("background.probability", background.probability),
            ("background.flat_ratio", background.flat_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GenerationError::InvalidOptions(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if background.min_canvas == 0 || background.min_canvas > background.max_canvas {
            return Err(GenerationError::InvalidOptions(
                "background canvas bounds must satisfy 0 < min_canvas <= max_canvas".to_string(),
            ));
        }
        if !(0.0..=180.0).contains(&background.max_rotation_degrees) {
            return Err(GenerationError::InvalidOptions(
                "background.max_rotation_degrees must be within [0, 180]".to_string(),
            ));
        }
        if self.text.font_scale == 0 {
            return Err(GenerationError::InvalidOptions(
                "text.font_scale must be >= 1".to_string(),
            ));
        }
        if self.text.font_px <= 0.0 {
            return Err(GenerationError::InvalidOptions(
                "text.font_px must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Augmentation workers, leaving one core for the main thread.
    pub fn resolved_augment_workers(&self) -> usize {
        self.augment_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|count| count.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        })
    }
}

/// One manifest record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: u64,
    pub template: String,
    pub image: String,
    pub fields: SampleMetadata,
}

/// A sample that did not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFailure {
    pub index: u64,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Report for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: String,
    pub seed: u64,
    pub samples_requested: u64,
    pub failure_policy: FailurePolicy,
    pub aborted: bool,
    pub generation_workers: usize,
    pub augment_workers: Option<usize>,
    pub succeeded: Vec<u64>,
    pub failed: Vec<SampleFailure>,
    pub augmented: Vec<u64>,
    pub augment_failed: Vec<SampleFailure>,
    /// Samples that completed after an abort and were removed.
    pub discarded: Vec<u64>,
    pub skipped_templates: Vec<String>,
    /// `template/field -> kind:id` references no registry resolves.
    pub unresolved_references: Vec<String>,
    pub template_usage: BTreeMap<String, u64>,
    pub generator_usage: BTreeMap<String, u64>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn new(run_id: String, samples_requested: u64, options: &GenerateOptions) -> Self {
        Self {
            run_id,
            seed: options.seed,
            samples_requested,
            failure_policy: options.failure_policy,
            aborted: false,
            generation_workers: options.generation_workers,
            augment_workers: None,
            succeeded: Vec::new(),
            failed: Vec::new(),
            augmented: Vec::new(),
            augment_failed: Vec::new(),
            discarded: Vec::new(),
            skipped_templates: Vec::new(),
            unresolved_references: Vec::new(),
            template_usage: BTreeMap::new(),
            generator_usage: BTreeMap::new(),
            duration_ms: 0,
        }
    }

    pub fn record_template_usage(&mut self, name: &str) {
        *self.template_usage.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn record_generator_usage(&mut self, id: &str) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, index: u64, template: Option<String>, err: &GenerationError) {
        self.failed.push(SampleFailure {
            index,
            code: err.code().to_string(),
            message: err.to_string(),
            template,
        });
    }

    pub fn record_augment_failure(&mut self, index: u64, err: &GenerationError) {
        self.augment_failed.push(SampleFailure {
            index,
            code: err.code().to_string(),
            message: err.to_string(),
            template: None,
        });
    }

    pub fn failed_indices(&self) -> Vec<u64> {
        self.failed.iter().map(|failure| failure.index).collect()
    }
}
