//! arenapack CLI
//!
//! Packs id Tech 3 maps, weapon models and player models together with
//! exactly the shader definitions and images they use.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use tracing::{error, info};

use arenapack_core::types::JobKind;
use arenapack_deps::{lint_clamp_collisions, pack_closure, Closure, CollectorConfig, DependencyCollector};
use arenapack_export::{ImageCrateCodec, PackReport, ZipArchiveWriter};
use arenapack_parsers::logging::{init_with_config, TracingConfig};
use arenapack_parsers::parse_shader_script;
use arenapack_vfs::{FileStore, FilesystemStore};

/// arenapack - dependency resolver and packer for id Tech 3 content
#[derive(Parser)]
#[command(name = "arenapack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Content root (overrides the configuration)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output directory (overrides the configuration)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack maps (maps/<name>.bsp)
    Map(NamesArgs),

    /// Pack a weapon or item model and its skins
    Model(PathArgs),

    /// Pack player models (models/players/<name>/)
    Player(NamesArgs),

    /// Print the closure of a map, model or player directory without packing
    Deps(PathArgs),

    /// List the definitions of one shader script
    Shaders(ShadersArgs),

    /// Report images used with both map and clampMap
    Clamp,
}

#[derive(Args)]
struct NamesArgs {
    /// Names to pack; several names are packed in parallel
    #[arg(required = true)]
    names: Vec<String>,
}

#[derive(Args)]
struct PathArgs {
    /// Path relative to the content root
    path: String,
}

#[derive(Args)]
struct ShadersArgs {
    /// Path to a .shader file
    file: PathBuf,
}

fn load_config(cli: &Cli) -> Result<CollectorConfig> {
    let mut config = match &cli.config {
        Some(path) => CollectorConfig::load(path)
            .map_err(arenapack_core::Error::from)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => CollectorConfig::default(),
    };

    if let Some(root) = &cli.root {
        config.content_root = root.clone();
    }
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with_config(TracingConfig::for_verbosity(cli.verbose));

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Map(args) => cmd_pack(JobKind::Map, &args.names, &config, cli.format),
        Commands::Model(args) => cmd_pack(JobKind::Model, std::slice::from_ref(&args.path), &config, cli.format),
        Commands::Player(args) => cmd_pack(JobKind::Player, &args.names, &config, cli.format),
        Commands::Deps(args) => cmd_deps(&args.path, &config, cli.format),
        Commands::Shaders(args) => cmd_shaders(&args.file, cli.format),
        Commands::Clamp => cmd_clamp(&config, cli.format),
    }
}

fn open_store(config: &CollectorConfig) -> Result<FilesystemStore> {
    FilesystemStore::new(&config.content_root)
        .with_context(|| format!("Failed to open content root {}", config.content_root.display()))
}

/// Content path of a job input given on the command line
fn job_input(job: JobKind, name: &str) -> String {
    match job {
        JobKind::Map if name.ends_with(".bsp") => name.to_string(),
        JobKind::Map => format!("maps/{name}.bsp"),
        JobKind::Model => name.to_string(),
        JobKind::Player if name.contains('/') => name.to_string(),
        JobKind::Player => format!("models/players/{name}"),
    }
}

/// Short failure class reported next to each failed job
fn failure_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<arenapack_core::Error>() {
        Some(e) if e.is_not_found() => "missing",
        Some(e) if e.is_format_error() => "format",
        Some(arenapack_core::Error::InvalidConfig { .. }) => "config",
        _ => "io",
    }
}

struct JobOutcome {
    closure: Closure,
    report: PackReport,
    archive: PathBuf,
    archive_size: u64,
}

fn run_job(store: &dyn FileStore, config: &CollectorConfig, job: JobKind, name: &str) -> Result<JobOutcome> {
    let start = Instant::now();
    let collector = DependencyCollector::new(store, config);
    let closure = collector.collect(job, &job_input(job, name))?;

    let archive_path = config.archive_path(job, &closure.name);
    let mut archive = ZipArchiveWriter::create(&archive_path)
        .with_context(|| format!("Failed to create {}", archive_path.display()))?;
    let report = pack_closure(&closure, store, &ImageCrateCodec::new(), &mut archive)
        .map_err(arenapack_core::Error::from)
        .with_context(|| format!("Failed to pack {}", closure.name))?;

    let archive_size = std::fs::metadata(&archive_path).map(|m| m.len()).unwrap_or(0);
    info!(
        job = %job,
        name = %closure.name,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Job complete"
    );

    Ok(JobOutcome {
        closure,
        report,
        archive: archive_path,
        archive_size,
    })
}

fn cmd_pack(job: JobKind, names: &[String], config: &CollectorConfig, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;

    let results: Vec<(&String, Result<JobOutcome>)> = names
        .par_iter()
        .map(|name| (name, run_job(&store, config, job, name)))
        .collect();

    let mut failed = 0;
    let mut summaries = Vec::new();
    for (name, result) in results {
        match result {
            Ok(outcome) => match format {
                OutputFormat::Json => summaries.push(serde_json::json!({
                    "job": outcome.closure.job,
                    "name": outcome.closure.name,
                    "archive": outcome.archive,
                    "size": outcome.archive_size,
                    "entries": outcome.report.entries,
                    "resized": outcome.report.resized,
                    "unresolved": outcome.closure.unresolved,
                    "warnings": outcome.closure.warnings.iter().chain(&outcome.report.warnings).collect::<Vec<_>>(),
                })),
                OutputFormat::Text => print_outcome(&outcome),
            },
            Err(e) => {
                failed += 1;
                let kind = failure_kind(&e);
                error!(job = %job, name = %name, kind, "{e:#}");
                if format == OutputFormat::Json {
                    summaries.push(serde_json::json!({
                        "job": job,
                        "name": name,
                        "kind": kind,
                        "error": format!("{e:#}"),
                    }));
                }
            }
        }
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    if failed > 0 {
        bail!("{failed} of {} {job} jobs failed", names.len());
    }
    Ok(())
}

fn print_outcome(outcome: &JobOutcome) {
    let closure = &outcome.closure;
    println!(
        "{} {}: {} entries ({} resized) -> {} ({})",
        closure.job,
        closure.name,
        outcome.report.entries.len(),
        outcome.report.resized.len(),
        outcome.archive.display(),
        format_size(outcome.archive_size)
    );
    for warning in closure.warnings.iter().chain(&outcome.report.warnings) {
        println!("  warning: {warning}");
    }
}

fn cmd_deps(path: &str, config: &CollectorConfig, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let collector = DependencyCollector::new(&store, config);

    let job = if path.ends_with(".bsp") {
        JobKind::Map
    } else if path.ends_with(".md3") {
        JobKind::Model
    } else if store.is_dir(path) {
        JobKind::Player
    } else {
        bail!("Cannot tell the job kind of {path}: expected a .bsp, a .md3 or a directory");
    };
    let closure = collector.collect(job, path)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&closure)?),
        OutputFormat::Text => {
            println!("{} {}", closure.job, closure.name);
            println!("{:-<60}", "");
            for file in &closure.files {
                println!("{:<14} {}", file.kind, file.path);
            }
            if !closure.entities.is_empty() {
                println!("\nEntities:");
                for entity in &closure.entities {
                    println!("  {entity}");
                }
            }
            if !closure.contributing_scripts.is_empty() {
                println!("\nScripts:");
                for script in &closure.contributing_scripts {
                    println!("  {script}");
                }
            }
            for warning in &closure.warnings {
                println!("warning: {warning}");
            }
            println!(
                "\nTotal: {} files, {} textures, {} unresolved",
                closure.files.len(),
                closure.texture_count(),
                closure.unresolved.len()
            );
        }
    }
    Ok(())
}

fn cmd_shaders(file: &Path, format: OutputFormat) -> Result<()> {
    let script = parse_shader_script(file).with_context(|| format!("Failed to parse {}", file.display()))?;

    match format {
        OutputFormat::Json => {
            let definitions: Vec<_> = script
                .definitions
                .iter()
                .map(|d| serde_json::json!({ "name": d.name, "textures": d.textures }))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "definitions": definitions,
                    "dropped": script.dropped,
                }))?
            );
        }
        OutputFormat::Text => {
            for definition in &script.definitions {
                println!("{}", definition.name);
                for texture in &definition.textures {
                    println!("  {texture}");
                }
            }
            if let Some(name) = &script.dropped {
                println!("unterminated: {name}");
            }
            println!("\nTotal: {} definitions", script.len());
        }
    }
    Ok(())
}

fn cmd_clamp(config: &CollectorConfig, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let collisions = lint_clamp_collisions(&store, &config.scripts_dir).context("Failed to scan shader scripts")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&collisions)?),
        OutputFormat::Text => {
            for c in &collisions {
                println!("{}: map in {}, clampMap in {}", c.texture, c.map_script, c.clamp_script);
            }
            println!("\nTotal: {} collisions", collisions.len());
        }
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenapack_deps::ResolveError;

    #[test]
    fn test_job_input() {
        assert_eq!(job_input(JobKind::Map, "arena1"), "maps/arena1.bsp");
        assert_eq!(job_input(JobKind::Map, "maps/arena1.bsp"), "maps/arena1.bsp");
        assert_eq!(job_input(JobKind::Player, "sarge"), "models/players/sarge");
        assert_eq!(job_input(JobKind::Model, "models/weapons/rifle/rifle.md3"), "models/weapons/rifle/rifle.md3");
    }

    #[test]
    fn test_failure_kind() {
        let missing = anyhow::Error::new(arenapack_core::Error::from(ResolveError::MissingInput {
            path: "maps/none.bsp".into(),
        }))
        .context("Failed to pack none");
        assert_eq!(failure_kind(&missing), "missing");

        let config = anyhow::Error::new(arenapack_core::Error::from(ResolveError::Config("bad".into())));
        assert_eq!(failure_kind(&config), "config");

        let bad_magic = anyhow::Error::new(arenapack_core::Error::InvalidMagic {
            expected: b"IBSP".to_vec(),
            found: b"IDP3".to_vec(),
        });
        assert_eq!(failure_kind(&bad_magic), "format");

        assert_eq!(failure_kind(&anyhow::anyhow!("disk full")), "io");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["arenapack", "-vv", "--format", "json", "map", "arena1", "arena2"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Map(ref a) if a.names.len() == 2));

        assert!(Cli::try_parse_from(["arenapack", "player"]).is_err());
    }
}
