//! mdx-loader CLI - Load frontmatter markdown trees into SQLite

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use mdx_loader::config::{self, LoaderConfig, DATABASE_PATH_ENV};
use mdx_loader::migrations;
use mdx_loader::ui::{self, Icons};
use mdx_loader::{ConflictPolicy, ContentMigrator, Database};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mdx-loader")]
#[command(version)]
#[command(about = "Load frontmatter-annotated markdown trees into SQLite")]
#[command(long_about = r#"
mdx-loader reconciles the database schema with its migration journal, then
loads every document under <content>/<source folder>/<type>/ into the
content, tags and content_tags tables.

Example usage:
  mdx-loader init
  mdx-loader migrate --content ./content
  mdx-loader schema --database ./database/content.db
  mdx-loader stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: mdx-loader.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the schema, then load the content tree
    Migrate {
        /// Content root containing the source folders
        #[arg(long)]
        content: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Migration folder with meta/_journal.json (built-in schema when omitted)
        #[arg(short, long)]
        migrations: Option<PathBuf>,

        /// Update documents whose slug is already stored instead of failing them
        #[arg(long)]
        update: bool,

        /// Exit non-zero when any document failed
        #[arg(long)]
        strict: bool,
    },

    /// Reconcile and run schema migrations only
    Schema {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Migration folder with meta/_journal.json (built-in schema when omitted)
        #[arg(short, long)]
        migrations: Option<PathBuf>,
    },

    /// Show row counts
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let settings = config::load_config(Some(&config_path))?.unwrap_or_default();

    match cli.command {
        Commands::Migrate { content, database, migrations: migrations_dir, update, strict } => {
            let content_dir = settings.content_dir(content.as_deref()).ok_or_else(|| {
                anyhow::anyhow!("no content directory (pass --content or set content_dir in {})", config_path.display())
            })?;
            let scan = settings.scan_config(&content_dir)?;
            let journal = settings.journal(migrations_dir.as_deref())?;
            let db = open_database(&settings, database.as_deref())?;

            ui::header("Migrating content");
            ui::info(Icons::FOLDER, "Content", &content_dir.display().to_string());
            ui::info(Icons::DATABASE, "Database", &db.path().display().to_string());

            ui::phase("Schema");
            let spinner = ui::Spinner::new("Reconciling schema...");
            let outcome = migrations::migrate(&db, &journal).inspect_err(|_| spinner.abandon())?;
            spinner.finish("Schema up to date");
            println!("{}", ui::outcome_table(&outcome));

            ui::phase("Documents");
            let policy = if update { ConflictPolicy::Update } else { ConflictPolicy::Fail };
            let spinner = ui::Spinner::new("Loading documents...");
            let summary = ContentMigrator::new(&db)
                .with_conflict_policy(policy)
                .migrate(&scan)
                .inspect_err(|_| spinner.abandon())?;
            spinner.finish("Documents loaded");

            ui::section("Summary");
            println!("{}", ui::summary_table(&summary));

            if !summary.failures.is_empty() {
                ui::section("Failures");
                eprintln!("{}", ui::failures_table(&summary.failures));
            }

            if summary.errors > 0 {
                ui::warn(&format!("{} document(s) failed", summary.errors));
                if strict {
                    anyhow::bail!("{} of {} documents failed", summary.errors, summary.total());
                }
            } else {
                ui::success("Migration complete");
            }
        }

        Commands::Schema { database, migrations: migrations_dir } => {
            let journal = settings.journal(migrations_dir.as_deref())?;
            let db = open_database(&settings, database.as_deref())?;

            ui::header("Migrating schema");
            ui::info(Icons::DATABASE, "Database", &db.path().display().to_string());
            ui::summary_row("Journal entries:", &journal.len().to_string());

            let spinner = ui::Spinner::new("Reconciling schema...");
            let outcome = migrations::migrate(&db, &journal).inspect_err(|_| spinner.abandon())?;
            spinner.finish("Schema up to date");
            println!("{}", ui::outcome_table(&outcome));
            for tag in &outcome.executed {
                ui::summary_row("executed", tag);
            }
            for hash in &outcome.marked {
                ui::summary_row("marked", hash);
            }
        }

        Commands::Stats { database } => {
            let db = open_database(&settings, database.as_deref())?;
            let stats = db.stats()?;

            ui::header(&format!("{} mdx-loader Statistics", Icons::STATS));
            ui::info(Icons::DATABASE, "Database", &db.path().display().to_string());
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Init { force } => {
            config::write_config(&config_path, &LoaderConfig::starter(), force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }
    }

    Ok(())
}

fn open_database(settings: &LoaderConfig, flag: Option<&Path>) -> anyhow::Result<Database> {
    let path = settings.database_path(flag, std::env::var(DATABASE_PATH_ENV).ok());
    config::ensure_db_dir(&path)?;
    tracing::debug!("Opening database {}", path.display());
    Ok(Database::open(&path)?)
}
