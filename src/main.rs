use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::json;

use modcompat::catalog::snapshot::CatalogSnapshot;
use modcompat::catalog::store::Store;
use modcompat::catalog::storer::CompatStorer;
use modcompat::catalog::types::ReleaseId;
use modcompat::config::EngineConfig;
use modcompat::engine::Engine;
use modcompat::resolve::materializer::Drift;
use modcompat::version::{Constraint, parse_version};

#[derive(Parser)]
#[command(name = "modcompat")]
#[command(version, about = "Version constraint resolution engine for a mod marketplace")]
struct Cli {
    /// Database file (overrides config and MODCOMPAT_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a JSON catalog snapshot and resolve it
    Import { file: PathBuf },
    /// Recompute every derived row
    Rebuild,
    /// Compare derived rows with a fresh recomputation
    Verify,
    /// Evaluate a constraint against versions without touching the database
    Check {
        constraint: String,
        #[arg(required = true)]
        versions: Vec<String>,
    },
    /// Print the resolved state of one release as JSON
    Show { release_id: i64 },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = modcompat::logging::init(cli.log_file.as_deref(), cli.log_json)?;

    if let Command::Check {
        constraint,
        versions,
    } = &cli.command
    {
        return check(constraint, versions);
    }

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(db) = cli.db {
        config.store.path = Some(db);
    }
    let db_path = config.db_path();
    let engine = Engine::open(config)
        .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;

    match cli.command {
        Command::Import { file } => {
            let snapshot = CatalogSnapshot::from_path(&file)
                .with_context(|| format!("Failed to read snapshot {:?}", file))?;
            let report = engine.import_snapshot(&snapshot)?;
            println!(
                "Imported {} artifacts, {} releases, {} requirements, {} platform versions",
                report.artifacts, report.releases, report.requirements, report.platform_versions
            );
        }
        Command::Rebuild => {
            let stats = engine.materialize_all()?;
            println!(
                "Rebuilt {} releases and {} requirements ({} changed)",
                stats.releases, stats.requirements, stats.changed
            );
        }
        Command::Verify => {
            let drift = engine.verify()?;
            for entry in &drift {
                println!("{}", describe_drift(entry));
            }
            if !drift.is_empty() {
                bail!("{} derived sets are out of date; run `modcompat rebuild`", drift.len());
            }
            println!("Derived rows are consistent");
        }
        Command::Show { release_id } => show(&engine, ReleaseId(release_id))?,
        Command::Check { .. } => {}
    }

    Ok(())
}

fn check(constraint: &str, versions: &[String]) -> anyhow::Result<()> {
    let constraint = Constraint::parse(constraint)?;
    if constraint.is_unconstrained() {
        println!("Constraint is blank: matches nothing");
    }
    for version in versions {
        let matched = parse_version(version)
            .map(|v| constraint.matches(&v))
            .unwrap_or(false);
        println!("{}\t{}", if matched { "match" } else { "no" }, version);
    }
    Ok(())
}

fn show(engine: &Engine<Store>, release_id: ReleaseId) -> anyhow::Result<()> {
    let release = engine
        .store()
        .get_release(release_id)?
        .with_context(|| format!("Release {} not found", release_id))?;

    let mut requirements = Vec::new();
    for requirement in engine.store().requirements_of_release(release_id)? {
        requirements.push(json!({
            "id": requirement.id,
            "targetArtifactId": requirement.target_artifact_id,
            "constraint": requirement.constraint,
            "matches": engine.resolved_matches_for(requirement.id)?,
        }));
    }

    let output = json!({
        "release": release,
        "platformVersions": engine.resolved_platform_versions_for(release_id)?,
        "requirements": requirements,
        "latestMatches": engine.latest_resolved_matches_for(release_id)?,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn describe_drift(drift: &Drift) -> String {
    match drift {
        Drift::Platform {
            release_id,
            missing,
            stale,
        } => format!(
            "release {}: missing platform versions {:?}, stale {:?}",
            release_id, missing, stale
        ),
        Drift::Requirement {
            requirement_id,
            missing,
            stale,
        } => format!(
            "requirement {}: missing releases {:?}, stale {:?}",
            requirement_id, missing, stale
        ),
    }
}
