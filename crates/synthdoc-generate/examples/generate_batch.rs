use std::env;
use std::path::PathBuf;

use synthdoc_core::TemplateStore;
use synthdoc_generate::{
    BackgroundCorpus, BatchEngine, DirectoryCorpus, EmptyCorpus, GenerateOptions, ScanDegrader,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut metadata: Option<PathBuf> = None;
    let mut assets_dir: Option<PathBuf> = None;
    let mut backgrounds_dir: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut samples = 10_u64;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--metadata" => metadata = args.next().map(PathBuf::from),
            "--assets" => assets_dir = args.next().map(PathBuf::from),
            "--backgrounds" => backgrounds_dir = args.next().map(PathBuf::from),
            "--out" => out_dir = args.next().map(PathBuf::from),
            "--samples" => {
                samples = args
                    .next()
                    .ok_or("--samples needs a value")?
                    .parse()?;
            }
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let metadata = metadata.ok_or("--metadata is required")?;
    let assets_dir = assets_dir.ok_or("--assets is required")?;
    let templates = TemplateStore::load(&metadata, &assets_dir)?;
    let corpus: Box<dyn BackgroundCorpus> = match backgrounds_dir {
        Some(dir) => Box::new(DirectoryCorpus::open(&dir)?),
        None => Box::new(EmptyCorpus),
    };

    let options = GenerateOptions {
        out_dir: out_dir.unwrap_or_else(|| PathBuf::from("out")),
        augment: true,
        ..GenerateOptions::default()
    };
    let result = BatchEngine::new(options).run(
        &templates,
        corpus.as_ref(),
        &ScanDegrader::default(),
        samples,
    )?;

    println!("run_dir: {}", result.run_dir.display());
    println!("samples: {}", result.manifest.len());
    Ok(())
}
