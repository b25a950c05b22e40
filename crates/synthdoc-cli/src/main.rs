mod config;
mod registry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use schemars::schema_for;
use thiserror::Error;
use uuid::Uuid;

use synthdoc_core::{
    Error as CoreError, MetadataDocument, TemplateStore, ValueSourceKind, load_metadata,
};
use synthdoc_generate::{
    BackgroundCorpus, BatchEngine, DirectoryCorpus, EmptyCorpus, FailurePolicy, GenerateOptions,
    GenerationError, RegistrySet, ScanDegrader, TemplateSelection,
};

use config::ConfigError;
use registry::{RunContext, init_console_logging, init_run_logging, start_run};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("template error: {0}")]
    Core(#[from] CoreError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("metadata check failed with {0} issue(s)")]
    Check(usize),
}

#[derive(Parser, Debug)]
#[command(
    name = "synthdoc",
    version,
    about = "Template-driven synthetic document image generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a batch of samples from template metadata.
    Generate(GenerateArgs),
    /// Validate a metadata file against the generator registries.
    Check(CheckArgs),
    /// List every registered generator id.
    Generators(GeneratorsArgs),
    /// Print the JSON Schema of the template metadata format.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of samples to generate (>= 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    num_samples: u64,
    /// Degrade every generated sample after the batch.
    #[arg(long, default_value_t = false)]
    augment: bool,
    /// Template metadata JSON file.
    #[arg(long, default_value = "assets/metadata.json")]
    metadata: PathBuf,
    /// Directory holding the template base images.
    #[arg(long, default_value = "assets")]
    assets_dir: PathBuf,
    /// Directory of background photos; flat canvases only when omitted.
    #[arg(long)]
    backgrounds_dir: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Batch seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Generation worker threads.
    #[arg(long)]
    workers: Option<usize>,
    /// Augmentation worker threads [default: available cores - 1].
    #[arg(long)]
    augment_workers: Option<usize>,
    /// What to do when a sample fails: `abort` stops the batch, `skip`
    /// records the failure and continues [default: skip].
    #[arg(long, value_name = "POLICY", value_parser = parse_failure_policy)]
    on_sample_error: Option<FailurePolicy>,
    /// Template choice per sample: `random` or `round-robin`.
    #[arg(long, value_name = "MODE", value_parser = parse_template_selection)]
    template_selection: Option<TemplateSelection>,
    /// Anchor date for relative dates (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    reference_date: Option<NaiveDate>,
    /// Probability of placing a sample on a background.
    #[arg(long)]
    background_probability: Option<f64>,
    /// TrueType font used instead of the builtin bitmap face.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Pixel height for `--font`.
    #[arg(long)]
    font_px: Option<f32>,
    /// Scale of the builtin bitmap face.
    #[arg(long)]
    font_scale: Option<u32>,
    /// Fail when any template cannot be loaded instead of skipping it.
    #[arg(long, default_value_t = false)]
    strict_templates: bool,
    /// TOML file with generation options; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl GenerateArgs {
    fn apply(&self, options: &mut GenerateOptions) {
        if let Some(out_dir) = &self.out_dir {
            options.out_dir = out_dir.clone();
        }
        if let Some(seed) = self.seed {
            options.seed = seed;
        }
        if let Some(workers) = self.workers {
            options.generation_workers = workers;
        }
        if self.augment_workers.is_some() {
            options.augment_workers = self.augment_workers;
        }
        if self.augment {
            options.augment = true;
        }
        if let Some(policy) = self.on_sample_error {
            options.failure_policy = policy;
        }
        if let Some(selection) = self.template_selection {
            options.template_selection = selection;
        }
        if let Some(date) = self.reference_date {
            options.reference_date = date;
        }
        if let Some(probability) = self.background_probability {
            options.background.probability = probability;
        }
        if let Some(font) = &self.font {
            options.text.font_path = Some(font.clone());
        }
        if let Some(px) = self.font_px {
            options.text.font_px = px;
        }
        if let Some(scale) = self.font_scale {
            options.text.font_scale = scale;
        }
    }
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Template metadata JSON file.
    #[arg(long, default_value = "assets/metadata.json")]
    metadata: PathBuf,
    /// Also load every base image from this directory.
    #[arg(long)]
    assets_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GeneratorsArgs {
    /// Print a JSON object instead of one id per line.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema to this file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Check(args) => run_check(args),
        Command::Generators(args) => run_generators(args),
        Command::Schema(args) => run_schema(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let mut options = config::load_options(args.config.as_deref())?;
    args.apply(&mut options);
    options.validate()?;

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        num_samples: args.num_samples,
        metadata_path: args.metadata.clone(),
        assets_dir: args.assets_dir.clone(),
        backgrounds_dir: args.backgrounds_dir.clone(),
        options: options.clone(),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        run_dir = %run_paths.run_root.display(),
        num_samples = args.num_samples,
        failure_policy = %options.failure_policy
    );

    let timer = Instant::now();

    let loaded = TemplateStore::load_lenient(&args.metadata, &args.assets_dir)?;
    let mut skipped = Vec::with_capacity(loaded.failures.len());
    for failure in &loaded.failures {
        tracing::warn!(event = "template_skipped", error = %failure);
        skipped.push(failure.template().unwrap_or("<unknown>").to_string());
    }
    if args.strict_templates && !skipped.is_empty() {
        return Err(CliError::InvalidConfig(format!(
            "{} template(s) failed to load: {}",
            skipped.len(),
            skipped.join(", ")
        )));
    }
    tracing::info!(
        event = "templates_loaded",
        templates = loaded.store.len(),
        skipped = skipped.len()
    );

    let corpus: Box<dyn BackgroundCorpus> = match &args.backgrounds_dir {
        Some(dir) => Box::new(DirectoryCorpus::open(dir)?),
        None => Box::new(EmptyCorpus),
    };
    tracing::info!(event = "backgrounds_indexed", backgrounds = corpus.len());

    let engine = BatchEngine::new(options).with_skipped_templates(skipped);
    let degrader = ScanDegrader::default();
    let result = engine.run_in(
        &run_paths.run_root,
        &run_id,
        &loaded.store,
        corpus.as_ref(),
        &degrader,
        args.num_samples,
    );

    let duration_ms = timer.elapsed().as_millis();
    match result {
        Ok(batch) => {
            tracing::info!(
                event = "run_finished",
                status = "success",
                succeeded = batch.report.succeeded.len(),
                failed = batch.report.failed.len(),
                duration_ms = duration_ms
            );
            println!("run directory: {}", batch.run_dir.display());
            println!(
                "samples: {} succeeded, {} failed, {} augmented",
                batch.report.succeeded.len(),
                batch.report.failed.len(),
                batch.report.augmented.len()
            );
            for failure in &batch.report.failed {
                println!("  sample {} failed: {}", failure.index, failure.message);
            }
            Ok(())
        }
        Err(err) => {
            tracing::warn!(
                event = "run_finished",
                status = "failed",
                code = err.code(),
                error = %err,
                duration_ms = duration_ms
            );
            println!("run directory: {}", run_paths.run_root.display());
            Err(err.into())
        }
    }
}

fn run_check(args: CheckArgs) -> Result<(), CliError> {
    init_console_logging()?;

    let document = load_metadata(&args.metadata)?;
    let registries = RegistrySet::new(GenerateOptions::default().reference_date)?;
    let mut issues = reference_issues(&document, &registries);

    let mut templates = document.templates.len();
    if let Some(assets_dir) = &args.assets_dir {
        let loaded = TemplateStore::load_lenient(&args.metadata, assets_dir)?;
        templates = loaded.store.len();
        issues.extend(loaded.failures.iter().map(ToString::to_string));
    }

    if issues.is_empty() {
        let fields: usize = document
            .templates
            .values()
            .map(|entry| entry.fields.len())
            .sum();
        println!("ok: {templates} template(s), {fields} field(s)");
        return Ok(());
    }
    for issue in &issues {
        println!("{issue}");
    }
    Err(CliError::Check(issues.len()))
}

fn reference_issues(document: &MetadataDocument, registries: &RegistrySet) -> Vec<String> {
    let mut issues = Vec::new();
    for (template, entry) in &document.templates {
        for (field, spec) in &entry.fields {
            if let Err(err) = registries.validate(&spec.value_source) {
                issues.push(format!("{template}/{field}: {err}"));
            }
        }
    }
    issues
}

fn run_generators(args: GeneratorsArgs) -> Result<(), CliError> {
    let registries = RegistrySet::new(GenerateOptions::default().reference_date)?;
    let builtin = registries.registry(ValueSourceKind::Builtin).ids();
    let custom = registries.registry(ValueSourceKind::Custom).ids();

    if args.json {
        let catalog = serde_json::json!({ "builtin": builtin, "custom": custom });
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }
    for id in builtin {
        println!("{}:{id}", ValueSourceKind::Builtin);
    }
    for id in custom {
        println!("{}:{id}", ValueSourceKind::Custom);
    }
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = schema_for!(MetadataDocument);
    let json = serde_json::to_string_pretty(&schema)?;
    match args.out {
        Some(path) => write_text(&path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{contents}\n"))
}

fn parse_failure_policy(value: &str) -> Result<FailurePolicy, String> {
    value
        .parse::<FailurePolicy>()
        .map_err(|err| err.to_string())
}

fn parse_template_selection(value: &str) -> Result<TemplateSelection, String> {
    match value {
        "random" => Ok(TemplateSelection::Random),
        "round-robin" | "round_robin" => Ok(TemplateSelection::RoundRobin),
        other => Err(format!(
            "unknown template selection '{other}' (expected 'random' or 'round-robin')"
        )),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| format!("{value}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn zero_samples_is_rejected_by_the_parser() {
        let parsed = Cli::try_parse_from(["synthdoc", "generate", "--num-samples", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::try_parse_from([
            "synthdoc",
            "generate",
            "--num-samples",
            "3",
            "--seed",
            "9",
            "--on-sample-error",
            "abort",
            "--template-selection",
            "round-robin",
            "--reference-date",
            "2020-02-29",
        ])
        .expect("parse");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let mut options = config::parse_options("seed = 1\nfailure_policy = \"skip\"").expect("toml");
        args.apply(&mut options);
        assert_eq!(options.seed, 9);
        assert_eq!(options.failure_policy, FailurePolicy::Abort);
        assert_eq!(options.template_selection, TemplateSelection::RoundRobin);
        assert_eq!(
            options.reference_date,
            NaiveDate::from_ymd_opt(2020, 2, 29).expect("date")
        );
    }

    #[test]
    fn help_names_the_failure_policy() {
        let help = Cli::command()
            .find_subcommand_mut("generate")
            .expect("generate subcommand")
            .render_long_help()
            .to_string();
        assert!(help.contains("--on-sample-error"));
        assert!(help.contains("abort"));
    }

    #[test]
    fn unknown_references_are_listed_per_field() {
        let document: MetadataDocument = serde_json::from_str(
            r#"{"form.png": {"fields": {
                "ok": {"bbox": {"x": 0, "y": 0, "width": 5, "height": 5},
                       "metatype": {"source": "faker", "value": "name"}},
                "bad": {"bbox": {"x": 0, "y": 0, "width": 5, "height": 5},
                        "metatype": {"source": "custom", "value": "nope"}}
            }}}"#,
        )
        .expect("document");
        let registries =
            RegistrySet::new(GenerateOptions::default().reference_date).expect("registries");
        assert_eq!(
            reference_issues(&document, &registries),
            vec!["form.png/bad: unknown custom generator 'nope'".to_string()]
        );
    }
}
