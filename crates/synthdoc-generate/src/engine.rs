use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use image::RgbaImage;
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use synthdoc_core::{Template, TemplateStore};

use crate::augment::{Degrader, augment_file};
use crate::background::{BackgroundCorpus, Placement, place_on_background};
use crate::compositor::compose;
use crate::errors::GenerationError;
use crate::generators::RegistrySet;
use crate::model::{
    BatchReport, FailurePolicy, GenerateOptions, ManifestEntry, SampleMetadata, TemplateSelection,
};
use crate::output::{
    MANIFEST_FILE, REPORT_FILE, augment_seed, augmented_image_name, sample_image_name,
    sample_metadata_name, sample_seed, write_image_atomic, write_json_atomic,
};
use crate::text::{Font, TextExtent};

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub run_dir: PathBuf,
    pub manifest: Vec<ManifestEntry>,
    pub report: BatchReport,
}

/// One sample before persistence.
#[derive(Debug, Clone)]
pub struct RenderedSample {
    pub index: u64,
    pub template: String,
    pub image: RgbaImage,
    pub metadata: SampleMetadata,
    pub placement: Option<Placement>,
    /// Text extents in template coordinates, before background placement.
    pub extents: IndexMap<String, TextExtent>,
}

/// Everything a worker needs to render sample `i`, shared read-only.
pub struct SampleRenderer<'a> {
    templates: &'a TemplateStore,
    registries: &'a RegistrySet,
    font: &'a Font,
    corpus: &'a dyn BackgroundCorpus,
    options: &'a GenerateOptions,
}

impl<'a> SampleRenderer<'a> {
    pub fn new(
        templates: &'a TemplateStore,
        registries: &'a RegistrySet,
        font: &'a Font,
        corpus: &'a dyn BackgroundCorpus,
        options: &'a GenerateOptions,
    ) -> Self {
        Self {
            templates,
            registries,
            font,
            corpus,
            options,
        }
    }

    /// Render sample `index`. The output is a pure function of the batch
    /// seed, the index and the shared inputs.
    pub fn render(&self, index: u64) -> Result<RenderedSample, GenerationError> {
        let (template, rng) = self.select(index)?;
        self.render_template(index, template, rng)
    }

    /// The sample's template and its random stream positioned after the
    /// template draw.
    fn select(&self, index: u64) -> Result<(&'a Template, ChaCha8Rng), GenerationError> {
        let mut rng = ChaCha8Rng::seed_from_u64(sample_seed(self.options.seed, index));
        let count = self.templates.len();
        if count == 0 {
            return Err(GenerationError::InvalidOptions(
                "template store is empty".to_string(),
            ));
        }
        let position = match self.options.template_selection {
            TemplateSelection::Random if count > 1 => rng.random_range(0..count),
            TemplateSelection::Random => 0,
            TemplateSelection::RoundRobin => (index % count as u64) as usize,
        };
        let template = self.templates.get(position).ok_or_else(|| {
            GenerationError::InvalidOptions(format!("template index {position} out of range"))
        })?;
        Ok((template, rng))
    }

    fn render_template(
        &self,
        index: u64,
        template: &Template,
        mut rng: ChaCha8Rng,
    ) -> Result<RenderedSample, GenerationError> {
        let composed = compose(template, self.registries, self.font, &mut rng)?;
        let placed = place_on_background(
            composed.image,
            self.corpus,
            &self.options.background,
            &mut rng,
        )?;
        Ok(RenderedSample {
            index,
            template: template.name().to_string(),
            image: placed.image,
            metadata: composed.metadata,
            placement: placed.placement,
            extents: composed.extents,
        })
    }
}

struct SampleError {
    template: Option<String>,
    error: GenerationError,
}

enum SampleOutcome {
    Done(ManifestEntry),
    Failed { index: u64, failure: SampleError },
    Skipped(u64),
}

/// Drives a batch: the generation pool, the manifest, then the optional
/// augmentation pool.
pub struct BatchEngine {
    options: GenerateOptions,
    registries: Option<RegistrySet>,
    skipped_templates: Vec<String>,
}

impl BatchEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self {
            options,
            registries: None,
            skipped_templates: Vec::new(),
        }
    }

    /// Use these registries instead of the stock builtin and custom sets.
    pub fn with_registries(mut self, registries: RegistrySet) -> Self {
        self.registries = Some(registries);
        self
    }

    /// Templates dropped at load time; recorded in the report.
    pub fn with_skipped_templates(mut self, names: Vec<String>) -> Self {
        self.skipped_templates = names;
        self
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Run a batch in a fresh `<out_dir>/<timestamp>__run_<uuid>` directory.
    pub fn run(
        &self,
        templates: &TemplateStore,
        corpus: &dyn BackgroundCorpus,
        degrader: &dyn Degrader,
        num_samples: u64,
    ) -> Result<BatchResult, GenerationError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
        let run_dir = self
            .options
            .out_dir
            .join(format!("{timestamp}__run_{run_id}"));
        self.run_in(&run_dir, &run_id, templates, corpus, degrader, num_samples)
    }

    /// Run a batch writing into `run_dir`.
    pub fn run_in(
        &self,
        run_dir: &Path,
        run_id: &str,
        templates: &TemplateStore,
        corpus: &dyn BackgroundCorpus,
        degrader: &dyn Degrader,
        num_samples: u64,
    ) -> Result<BatchResult, GenerationError> {
        if num_samples == 0 {
            return Err(GenerationError::InvalidOptions(
                "num_samples must be >= 1".to_string(),
            ));
        }
        if templates.is_empty() {
            return Err(GenerationError::InvalidOptions(
                "no templates to generate from".to_string(),
            ));
        }
        self.options.validate()?;

        let owned_registries;
        let registries = match &self.registries {
            Some(registries) => registries,
            None => {
                owned_registries = RegistrySet::new(self.options.reference_date)?;
                &owned_registries
            }
        };
        let font = match &self.options.text.font_path {
            Some(path) => Font::from_file(path, self.options.text.font_px)?,
            None => Font::builtin(self.options.text.font_scale),
        };
        let generation_pool = build_thread_pool(Some(self.options.generation_workers))?;

        let start = Instant::now();
        std::fs::create_dir_all(run_dir)?;

        let mut report = BatchReport::new(run_id.to_string(), num_samples, &self.options);
        report.skipped_templates = self.skipped_templates.clone();
        report.unresolved_references = unresolved_references(templates, registries);
        for reference in &report.unresolved_references {
            warn!(reference = %reference, "field references an unknown generator");
        }

        info!(
            run_id = %run_id,
            samples = num_samples,
            templates = templates.len(),
            seed = self.options.seed,
            generation_workers = self.options.generation_workers,
            failure_policy = %self.options.failure_policy,
            augment = self.options.augment,
            corpus = corpus.len(),
            "generation started"
        );

        let renderer = SampleRenderer::new(templates, registries, &font, corpus, &self.options);
        let abort_policy = self.options.failure_policy == FailurePolicy::Abort;
        let abort_at = AtomicU64::new(u64::MAX);
        let indices: Vec<u64> = (0..num_samples).collect();

        let outcomes: Vec<SampleOutcome> = generation_pool.install(|| {
            indices
                .par_iter()
                .map(|&index| {
                    if index > abort_at.load(Ordering::SeqCst) {
                        return SampleOutcome::Skipped(index);
                    }
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        persist_sample(&renderer, run_dir, index)
                    }))
                    .unwrap_or_else(|panic| {
                        Err(SampleError {
                            template: None,
                            error: GenerationError::Panicked {
                                index,
                                message: panic_message(panic),
                            },
                        })
                    });
                    match result {
                        Ok(entry) => SampleOutcome::Done(entry),
                        Err(failure) => {
                            if abort_policy {
                                abort_at.fetch_min(index, Ordering::SeqCst);
                            }
                            SampleOutcome::Failed { index, failure }
                        }
                    }
                })
                .collect()
        });

        let abort_index = abort_at.load(Ordering::SeqCst);
        let mut manifest = Vec::with_capacity(outcomes.len());
        let mut abort_error = None;
        for outcome in outcomes {
            match outcome {
                SampleOutcome::Done(entry) if entry.index > abort_index => {
                    discard_sample(run_dir, entry.index);
                    report.discarded.push(entry.index);
                }
                SampleOutcome::Done(entry) => {
                    report.succeeded.push(entry.index);
                    report.record_template_usage(&entry.template);
                    if let Some(template) = templates.by_name(&entry.template) {
                        for (_, field) in template.fields() {
                            report.record_generator_usage(&field.value_source.to_string());
                        }
                    }
                    manifest.push(entry);
                }
                SampleOutcome::Failed { index, .. } if index > abort_index => {
                    report.discarded.push(index);
                }
                SampleOutcome::Failed { index, failure } => {
                    warn!(
                        index,
                        code = failure.error.code(),
                        template = failure.template.as_deref().unwrap_or(""),
                        error = %failure.error,
                        "sample failed"
                    );
                    report.record_failure(index, failure.template, &failure.error);
                    if index == abort_index {
                        abort_error = Some(failure.error);
                    }
                }
                SampleOutcome::Skipped(index) => {
                    debug!(index, "sample skipped after abort");
                }
            }
        }
        report.aborted = abort_error.is_some();

        write_json_atomic(&run_dir.join(MANIFEST_FILE), &manifest)?;

        if self.options.augment && !report.aborted && !report.succeeded.is_empty() {
            let workers = self.options.resolved_augment_workers();
            report.augment_workers = Some(workers);
            let augment_pool = build_thread_pool(Some(workers))?;
            let seed = self.options.seed;
            info!(
                samples = report.succeeded.len(),
                workers,
                degrader = degrader.name(),
                "augmentation started"
            );

            let results: Vec<(u64, Result<(), GenerationError>)> = augment_pool.install(|| {
                report
                    .succeeded
                    .par_iter()
                    .map(|&index| {
                        let result = catch_unwind(AssertUnwindSafe(|| {
                            augment_file(
                                degrader,
                                &run_dir.join(sample_image_name(index)),
                                &run_dir.join(augmented_image_name(index)),
                                augment_seed(seed, index),
                            )
                        }))
                        .unwrap_or_else(|panic| {
                            Err(GenerationError::Panicked {
                                index,
                                message: panic_message(panic),
                            })
                        });
                        (index, result)
                    })
                    .collect()
            });

            for (index, result) in results {
                match result {
                    Ok(()) => report.augmented.push(index),
                    Err(err) => {
                        warn!(index, code = err.code(), error = %err, "augmentation failed");
                        report.record_augment_failure(index, &err);
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        write_json_atomic(&run_dir.join(REPORT_FILE), &report)?;

        if let Some(error) = abort_error {
            warn!(
                run_id = %run_id,
                index = abort_index,
                completed = report.succeeded.len(),
                discarded = report.discarded.len(),
                "generation aborted"
            );
            return Err(GenerationError::SampleFailed {
                index: abort_index,
                source: Box::new(error),
            });
        }
        if report.succeeded.is_empty() {
            warn!(run_id = %run_id, failed = report.failed.len(), "generation failed");
            return Err(GenerationError::Failed(Box::new(report)));
        }

        info!(
            run_id = %run_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            augmented = report.augmented.len(),
            duration_ms = report.duration_ms,
            "generation completed"
        );
        Ok(BatchResult {
            run_dir: run_dir.to_path_buf(),
            manifest,
            report,
        })
    }
}

fn persist_sample(
    renderer: &SampleRenderer<'_>,
    run_dir: &Path,
    index: u64,
) -> Result<ManifestEntry, SampleError> {
    let (template, rng) = renderer.select(index).map_err(|error| SampleError {
        template: None,
        error,
    })?;
    let name = template.name().to_string();
    let attach = |error: GenerationError| SampleError {
        template: Some(name.clone()),
        error,
    };

    let sample = renderer
        .render_template(index, template, rng)
        .map_err(attach)?;
    let image = sample_image_name(index);
    write_image_atomic(&run_dir.join(&image), sample.image).map_err(attach)?;
    if let Err(err) = write_json_atomic(&run_dir.join(sample_metadata_name(index)), &sample.metadata)
    {
        discard_sample(run_dir, index);
        return Err(attach(err));
    }
    debug!(index, template = %name, image = %image, "sample written");

    Ok(ManifestEntry {
        index,
        template: name,
        image,
        fields: sample.metadata,
    })
}

/// Remove the files of a sample that is not part of the manifest.
fn discard_sample(run_dir: &Path, index: u64) {
    for name in [sample_image_name(index), sample_metadata_name(index)] {
        let path = run_dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove discarded sample")
            }
        }
    }
}

/// `template/field -> kind:id` for every reference no registry resolves.
pub fn unresolved_references(templates: &TemplateStore, registries: &RegistrySet) -> Vec<String> {
    let mut unresolved = Vec::new();
    for template in templates.iter() {
        for (field, spec) in template.fields() {
            if registries.validate(&spec.value_source).is_err() {
                unresolved.push(format!(
                    "{}/{} -> {}",
                    template.name(),
                    field,
                    spec.value_source
                ));
            }
        }
    }
    unresolved
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, GenerationError> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(GenerationError::InvalidOptions(
            "worker count must be >= 1 when set".to_string(),
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| GenerationError::ThreadPool(format!("failed to build rayon thread pool: {e}")))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        assert!(matches!(
            build_thread_pool(Some(0)),
            Err(GenerationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "panic during generation");
    }
}
