//! docsift command line.
//!
//! ```sh
//! docsift extract report.pdf slides.pptx -b both -o output -d document_data.db
//! docsift list
//! docsift show 3
//! docsift delete 3
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use docsift::config::Config;
use docsift::pipeline::Pipeline;
use docsift::storage::{BackendKind, SqliteStore};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Extract text, links, images and tables from PDF, DOCX, PPTX and PPT files
#[derive(Parser, Debug)]
#[command(name = "docsift", version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract files and store the results
    Extract {
        /// Input documents
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Storage backend(s)
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,

        /// Parent directory for file output
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        db: DatabaseArg,
    },

    /// List stored documents
    List {
        #[command(flatten)]
        db: DatabaseArg,
    },

    /// Show one stored document
    Show {
        id: i64,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        db: DatabaseArg,
    },

    /// Delete one stored document
    Delete {
        id: i64,

        #[command(flatten)]
        db: DatabaseArg,
    },
}

#[derive(clap::Args, Debug)]
struct DatabaseArg {
    /// SQLite database file
    #[arg(short, long = "database", value_name = "DB")]
    database: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    File,
    Sqlite,
    Both,
}

impl BackendArg {
    fn kinds(self) -> Vec<BackendKind> {
        match self {
            BackendArg::File => vec![BackendKind::File],
            BackendArg::Sqlite => vec![BackendKind::Sqlite],
            BackendArg::Both => vec![BackendKind::File, BackendKind::Sqlite],
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn database(config: &Config, db: &DatabaseArg) -> PathBuf {
    db.database.clone().unwrap_or_else(|| config.output.database.clone())
}

fn open_store(path: &Path) -> docsift::Result<SqliteStore> {
    if !path.is_file() {
        return Err(docsift::Error::FileNotFound(path.to_path_buf()));
    }
    SqliteStore::open(path)
}

fn run(cli: Cli, mut config: Config) -> docsift::Result<bool> {
    match cli.command {
        Command::Extract {
            files,
            backend,
            output,
            db,
        } => {
            if let Some(backend) = backend {
                config.output.backends = backend.kinds();
            }
            if let Some(output) = output {
                config.output.directory = output;
            }
            config.output.database = database(&config, &db);

            let report = Pipeline::from_config(&config).process_all(&files);
            for failure in report.failures() {
                eprintln!("{}: {}", failure.path.display(), failure.error);
            }
            println!(
                "{} processed, {} failed",
                report.processed().len(),
                report.failures().len()
            );
            Ok(report.is_success())
        },
        Command::List { db } => {
            let store = open_store(&database(&config, &db))?;
            println!(
                "{:>4}  {:<32} {:<5} {:>5} {:>6} {:>5} {:>6} {:>6}  saved",
                "id", "file", "type", "pages", "text", "links", "images", "tables"
            );
            for doc in store.list_documents()? {
                println!(
                    "{:>4}  {:<32} {:<5} {:>5} {:>6} {:>5} {:>6} {:>6}  {}",
                    doc.id,
                    doc.info.file_name,
                    doc.info.format,
                    doc.info.page_count,
                    doc.text_count,
                    doc.link_count,
                    doc.image_count,
                    doc.table_count,
                    doc.extracted_at
                );
            }
            Ok(true)
        },
        Command::Show { id, json, db } => {
            let store = open_store(&database(&config, &db))?;
            let Some(doc) = store.query_document(id)? else {
                eprintln!("no document with id {id}");
                return Ok(false);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(true);
            }
            let info = &doc.summary.info;
            println!("{} ({}, {} pages)", info.file_path, info.format, info.page_count);
            println!("sha256 {}", info.sha256);
            println!("saved  {}", doc.summary.extracted_at);
            println!();
            for segment in doc.text.iter().filter(|s| s.is_heading()) {
                let level = segment.heading_level.unwrap_or(1) as usize;
                println!("{} {} (p{})", "#".repeat(level), segment.text, segment.location.page);
            }
            for link in &doc.links {
                println!("link  p{}  {} <{}>", link.location.page, link.text, link.url);
            }
            for image in &doc.images {
                println!(
                    "image p{}  {} {} bytes",
                    image.location.page,
                    image.format.mime_type(),
                    image.data.len()
                );
            }
            for table in &doc.tables {
                println!(
                    "table p{}  #{} {}x{}",
                    table.location.page,
                    table.index,
                    table.row_count(),
                    table.column_count()
                );
            }
            Ok(true)
        },
        Command::Delete { id, db } => {
            let mut store = open_store(&database(&config, &db))?;
            if store.delete_document(id)? {
                println!("deleted document {id}");
                Ok(true)
            } else {
                eprintln!("no document with id {id}");
                Ok(false)
            }
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            },
        },
        None => Config::default(),
    };
    init_logging(&config, cli.verbose);

    match run(cli, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(stage = %err.stage(), error = %err, "command failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        },
    }
}
