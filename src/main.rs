//! schemaflow - schema evolution CLI and API server
//!
//! Runs consistency checks, compares schema versions and plans migrations
//! from the command line, or serves the same operations over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Consistency check of the current schema
//! schemaflow health-check --schema schema.json
//!
//! # Snapshot the current schema, then diff and plan against it later
//! schemaflow snapshot create release --schema schema.json --dated
//! schemaflow compare --from release-20261016-093000 --to schema.json
//! schemaflow plan --from release-20261016-093000 --to schema.json
//!
//! # Check one field in isolation
//! schemaflow validate-field createdAt:date
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use schemaflow_evolve::config::Settings;
use schemaflow_evolve::consistency::{default_rules, ConsistencyAnalyzer, FieldValidator};
use schemaflow_evolve::migration::MigrationPlanner;
use schemaflow_evolve::models::SchemaDescription;
use schemaflow_evolve::report::{self, Format, Presentable};
use schemaflow_evolve::routes::create_router;
use schemaflow_evolve::snapshot::store::dated_key;
use schemaflow_evolve::snapshot::{
    Comparator, FileSnapshotStore, Snapshot, SnapshotBuilder, SnapshotStore,
};
use schemaflow_evolve::state::AppState;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "schemaflow")]
#[command(version)]
#[command(about = "Schema evolution engine: consistency checks, diffs and migration plans", long_about = None)]
#[command(after_help = "SNAPSHOT REFERENCES:
    --from/--to accept a stored snapshot key or a path to a schema description (.json).
    A --from key that was never saved is treated as an empty schema.")]
struct Cli {
    /// Only show high severity findings and breaking changes
    #[arg(long, global = true)]
    critical_only: bool,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Snapshot directory (overrides SCHEMAFLOW_SNAPSHOT_DIR)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Format::Text,
            OutputFormat::Json => Format::Json,
        }
    }
}

#[derive(Args)]
struct SchemaArgs {
    /// Schema description file
    #[arg(short, long, env = "SCHEMAFLOW_SCHEMA", default_value = "schema.json")]
    schema: PathBuf,

    /// Version label for the built snapshot
    #[arg(long)]
    label: Option<String>,
}

impl SchemaArgs {
    fn build(&self) -> anyhow::Result<Snapshot> {
        build_from(&self.schema, self.label.as_deref().unwrap_or("current"))
    }
}

#[derive(Args)]
struct CompareArgs {
    /// Baseline snapshot key or description file
    #[arg(long)]
    from: String,

    /// Target snapshot key or description file
    #[arg(long)]
    to: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a consistency health check on the current schema
    HealthCheck {
        #[command(flatten)]
        schema: SchemaArgs,
    },
    /// Analyze a single named entity
    AnalyzeEntity {
        /// Entity name
        name: String,
        #[command(flatten)]
        schema: SchemaArgs,
    },
    /// Create, list and show stored snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
    /// Validate one `field:type` pair in isolation
    ValidateField {
        /// e.g. `createdAt:date`
        field: String,
        /// Check as if declared on this entity
        #[arg(long)]
        entity: Option<String>,
    },
    /// Compare two schema versions
    Compare {
        #[command(flatten)]
        args: CompareArgs,
    },
    /// Plan the migration between two schema versions
    Plan {
        #[command(flatten)]
        args: CompareArgs,
    },
    /// List the consistency rules
    Rules,
    /// Serve the HTTP API
    Serve {
        /// Bind address (overrides HOST)
        #[arg(long)]
        host: Option<Ipv4Addr>,
        /// Port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Build a snapshot from the schema description and store it
    Create {
        /// Snapshot name (used as key)
        name: String,
        /// Append a timestamp to the key
        #[arg(long)]
        dated: bool,
        #[command(flatten)]
        schema: SchemaArgs,
    },
    /// List stored snapshots, newest first
    List,
    /// Show one stored snapshot
    Show {
        key: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let serving = matches!(cli.command, Commands::Serve { .. });
    init_tracing(cli.verbose, serving);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load()?;
    if let Some(dir) = &cli.store_dir {
        settings.storage.snapshot_dir = dir.clone();
    }
    let format = Format::from(cli.format);
    let store = FileSnapshotStore::new(&settings.storage.snapshot_dir);

    match cli.command {
        Commands::HealthCheck { schema } => {
            let snapshot = schema.build()?;
            let mut analysis = ConsistencyAnalyzer::analyze(&snapshot);
            if cli.critical_only {
                analysis = analysis.critical_only();
            }
            emit(&analysis, format)
        }
        Commands::AnalyzeEntity { name, schema } => {
            let snapshot = schema.build()?;
            let mut entity = ConsistencyAnalyzer::analyze_entity(&snapshot, &name)?;
            if cli.critical_only {
                entity = entity.critical_only();
            }
            emit(&entity, format)
        }
        Commands::Snapshot { action } => match action {
            SnapshotAction::Create {
                name,
                dated,
                schema,
            } => {
                let key = if dated { dated_key(&name) } else { name.clone() };
                let version = schema.label.clone().unwrap_or(name);
                let snapshot = build_from(&schema.schema, &version)?;
                let metadata = store.save(&key, &snapshot)?;
                if format == Format::Json {
                    println!("{}", serde_json::to_string_pretty(&metadata)?);
                } else {
                    println!(
                        "{} Snapshot {} saved ({} entities, {} fields)",
                        "✓".green(),
                        metadata.key.cyan(),
                        metadata.entity_count,
                        metadata.field_count
                    );
                }
                Ok(())
            }
            SnapshotAction::List => {
                let snapshots = store.list()?;
                emit(snapshots.as_slice(), format)
            }
            SnapshotAction::Show { key } => {
                let snapshot = store
                    .load(&key)?
                    .with_context(|| format!("snapshot '{}' not found in {}", key, store.root().display()))?;
                emit(&snapshot, format)
            }
        },
        Commands::ValidateField { field, entity } => {
            let result = FieldValidator::validate_on(entity.as_deref(), &field);
            emit(&result, format)
        }
        Commands::Compare { args } => {
            let (old, new) = resolve_pair(&store, &args)?;
            let mut result = Comparator::compare(&old, &new);
            if cli.critical_only {
                result = result.breaking_only();
            }
            emit(&result, format)
        }
        Commands::Plan { args } => {
            let (old, new) = resolve_pair(&store, &args)?;
            let result = Comparator::compare(&old, &new);
            let plan = MigrationPlanner::plan_verified(&result, &old, &new)?;
            emit(&plan, format)
        }
        Commands::Rules => emit(default_rules().as_slice(), format),
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            serve(settings).await
        }
    }
}

fn emit<T: Presentable + ?Sized>(value: &T, format: Format) -> anyhow::Result<()> {
    let rendered = report::render(value, format)?;
    print!("{}", rendered);
    if format == Format::Json {
        println!();
    }
    Ok(())
}

fn build_from(path: &Path, version: &str) -> anyhow::Result<Snapshot> {
    let description = SchemaDescription::from_path(path)
        .with_context(|| format!("failed to read schema description {}", path.display()))?;
    Ok(SnapshotBuilder::build(&description, version)?)
}

fn is_description_path(reference: &str) -> bool {
    reference.ends_with(".json") || Path::new(reference).is_file()
}

/// Resolve `--from`/`--to`; a missing baseline key is an empty schema
fn resolve_pair(store: &FileSnapshotStore, args: &CompareArgs) -> anyhow::Result<(Snapshot, Snapshot)> {
    let old = if is_description_path(&args.from) {
        build_from(Path::new(&args.from), &args.from)?
    } else {
        match store.load(&args.from)? {
            Some(snapshot) => snapshot,
            None => {
                warn!("Snapshot '{}' not found, comparing against an empty schema", args.from);
                Snapshot::empty(&args.from)
            }
        }
    };

    let new = if is_description_path(&args.to) {
        build_from(Path::new(&args.to), &args.to)?
    } else {
        store
            .load(&args.to)?
            .with_context(|| format!("snapshot '{}' not found in {}", args.to, store.root().display()))?
    };

    Ok((old, new))
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    info!("🚀 Starting SchemaFlow Evolve API...");
    info!("📁 Snapshot directory: {}", settings.storage.snapshot_dir.display());

    let state = Arc::new(AppState::with_snapshot_dir(&settings.storage.snapshot_dir));
    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));
    info!("🌐 Server listening on http://{}", addr);
    info!("📚 API Endpoints:");
    info!("   GET  /health");
    info!("   POST /api/analyze               - Consistency report");
    info!("   POST /api/analyze/{{entity}}      - Single entity report");
    info!("   POST /api/validate-field        - Validate one field:type pair");
    info!("   GET  /api/rules                 - List consistency rules");
    info!("   POST /api/snapshots             - Create snapshot");
    info!("   GET  /api/snapshots             - List snapshots");
    info!("   GET  /api/snapshots/{{key}}       - Show snapshot");
    info!("   POST /api/compare               - Diff two versions");
    info!("   POST /api/plan                  - Plan migration");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing; `RUST_LOG` wins over the defaults
fn init_tracing(verbose: bool, serving: bool) {
    let default_filter = match (serving, verbose) {
        (_, true) => "debug",
        (true, false) => "info,schemaflow_evolve=debug,tower_http=debug",
        (false, false) => "warn",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(serving)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
