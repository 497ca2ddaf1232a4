//! Aldous CLI - schema-validated access to the Aldous document database.
//!
//! This is the entry point for the `aldous` binary.

mod commands;
mod templates;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use aldous_analysis::{AnalysisError, AnthropicClient, ModelConfig};
use aldous_gateway::{DocumentGateway, GatewayConfig, GatewayError};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::Request;

/// Aldous CLI - upload, update, query and delete documents with schema checks.
#[derive(Parser, Debug)]
#[command(name = "aldous")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable debug logging.
    #[arg(long, global = true, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Database connection settings.
#[derive(clap::Args, Debug)]
struct ConnectionArgs {
    /// Full MongoDB connection string; overrides the credential options.
    #[arg(long, env = "ALDOUS_MONGODB_URI", hide_env_values = true, global = true)]
    mongodb_uri: Option<String>,

    /// Database user.
    #[arg(long, env = "ALDOUS_MONGODB_USERNAME", global = true)]
    mongodb_username: Option<String>,

    /// Database password.
    #[arg(long, env = "ALDOUS_MONGODB_PASSWORD", hide_env_values = true, global = true)]
    mongodb_password: Option<String>,

    /// Cluster host for `mongodb+srv://` connections.
    #[arg(long, env = "ALDOUS_MONGODB_HOST", global = true)]
    mongodb_host: Option<String>,

    /// Database name.
    #[arg(long, env = "ALDOUS_DATABASE", default_value = "aldous_db", global = true)]
    database: String,

    /// Seconds to wait for the server before giving up.
    #[arg(long, env = "ALDOUS_CONNECT_TIMEOUT", default_value_t = 10, global = true)]
    connect_timeout: u64,
}

impl From<ConnectionArgs> for GatewayConfig {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            uri: args.mongodb_uri,
            username: args.mongodb_username,
            password: args.mongodb_password,
            host: args.mongodb_host,
            database: args.database,
            connect_timeout_seconds: args.connect_timeout,
            ..Self::default()
        }
    }
}

/// Completion-model settings for `analyze`.
#[derive(clap::Args, Debug)]
struct ModelArgs {
    /// Anthropic API key.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model identifier.
    #[arg(long, env = "ALDOUS_MODEL", default_value = "claude-3-7-sonnet-20250219")]
    model: String,

    /// Upper bound on generated tokens.
    #[arg(long, default_value_t = 8192)]
    max_tokens: u32,
}

impl From<ModelArgs> for ModelConfig {
    fn from(args: ModelArgs) -> Self {
        Self {
            api_key: args.api_key.unwrap_or_default(),
            model: args.model,
            max_tokens: args.max_tokens,
            ..Self::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a single document.
    Upload {
        /// Target collection.
        #[arg(short, long)]
        collection: String,
        /// Document as a JSON object.
        #[arg(short, long)]
        data: String,
    },

    /// Update documents matching a filter.
    Update {
        /// Target collection.
        #[arg(short, long)]
        collection: String,
        /// Fields to set, or operator directives with --operators.
        #[arg(short, long)]
        data: String,
        /// Filter as a JSON object.
        #[arg(short, long, required_unless_present = "all", conflicts_with = "all")]
        filter: Option<String>,
        /// Update every document in the collection.
        #[arg(long)]
        all: bool,
        /// Create a document when nothing matches.
        #[arg(long)]
        upsert: bool,
        /// Treat --data as update operators such as {"$inc": {...}}.
        #[arg(long)]
        operators: bool,
    },

    /// Delete documents matching a filter.
    Delete {
        /// Target collection.
        #[arg(short, long)]
        collection: String,
        /// Filter as a JSON object.
        #[arg(short, long, required_unless_present = "all", conflicts_with = "all")]
        filter: Option<String>,
        /// Delete every document in the collection.
        #[arg(long)]
        all: bool,
    },

    /// Query documents.
    Query {
        /// Target collection.
        #[arg(short, long)]
        collection: String,
        /// Filter as a JSON object; omit to match everything.
        #[arg(short, long)]
        filter: Option<String>,
        /// Maximum number of results (0 for no limit).
        #[arg(short, long, default_value_t = 0)]
        limit: u64,
        /// Field to sort by.
        #[arg(short, long)]
        sort: Option<String>,
        /// Sort ascending instead of descending.
        #[arg(long, requires = "sort")]
        ascending: bool,
    },

    /// Upload every valid document from a JSON file.
    Bulk {
        /// Target collection.
        #[arg(short, long)]
        collection: String,
        /// File holding one object or an array of objects.
        #[arg(long)]
        file: PathBuf,
    },

    /// Show document counts.
    Stats {
        /// Limit to one collection.
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Print a starter document for a collection.
    Template {
        /// Target collection.
        #[arg(short, long)]
        collection: String,
        /// Print an array of two documents for use with `bulk`.
        #[arg(long)]
        bulk: bool,
    },

    /// Regenerate the dashboard assessment for a subject.
    Analyze {
        /// The subject's ID.
        #[arg(long)]
        subject: String,

        #[command(flatten)]
        model: ModelArgs,
    },
}

/// What to run once arguments are checked.
enum Plan {
    /// Print without touching the database.
    Template { collection: String, bulk: bool },
    /// Run against the database, with a model client for `analyze`.
    Database {
        request: Request,
        model: Option<ModelConfig>,
    },
}

impl Command {
    fn into_plan(self) -> Result<Plan, GatewayError> {
        let request = match self {
            Self::Template { collection, bulk } => {
                return Ok(Plan::Template { collection, bulk });
            }
            Self::Analyze { subject, model } => {
                return Ok(Plan::Database {
                    request: Request::Analyze { subject },
                    model: Some(model.into()),
                });
            }
            Self::Upload { collection, data } => Request::Upload { collection, data },
            Self::Update {
                collection,
                data,
                filter,
                all,
                upsert,
                operators,
            } => Request::Update {
                collection,
                data,
                filter: commands::parse_filter(filter.as_deref(), all)?,
                upsert,
                operators,
            },
            Self::Delete {
                collection,
                filter,
                all,
            } => Request::Delete {
                collection,
                filter: commands::parse_filter(filter.as_deref(), all)?,
            },
            Self::Query {
                collection,
                filter,
                limit,
                sort,
                ascending,
            } => Request::Query {
                collection,
                filter: commands::parse_filter(filter.as_deref(), false)?,
                spec: commands::find_spec(limit, sort, ascending),
            },
            Self::Bulk { collection, file } => Request::Bulk { collection, file },
            Self::Stats { collection } => Request::Stats { collection },
        };
        Ok(Plan::Database {
            request,
            model: None,
        })
    }
}

/// Load `.env.local` then `.env`; variables already set win.
fn load_env_files() {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("aldous=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Process exit status for a failed command.
fn exit_code(error: &anyhow::Error) -> u8 {
    let code = if let Some(e) = error.downcast_ref::<GatewayError>() {
        e.exit_code()
    } else if let Some(e) = error.downcast_ref::<AnalysisError>() {
        e.exit_code()
    } else {
        1
    };
    u8::try_from(code).unwrap_or(1)
}

const CANCELLED: &str = "\nOperation cancelled by user";

/// Run `args` until done or until `cancel` resolves, whichever is first.
/// Cancellation is a clean exit; an open gateway is still closed.
async fn run<C>(args: Args, cancel: C) -> anyhow::Result<()>
where
    C: Future<Output = std::io::Result<()>>,
{
    let (request, model_config) = match args.command.into_plan()? {
        Plan::Template { collection, bulk } => {
            return commands::print_template(&mut std::io::stdout(), &collection, bulk);
        }
        Plan::Database { request, model } => (request, model),
    };

    // A missing API key fails before any connection attempt.
    let model = model_config.map(AnthropicClient::new).transpose()?;

    tokio::pin!(cancel);
    let config = GatewayConfig::from(args.connection);
    let gateway = tokio::select! {
        biased;
        _ = &mut cancel => {
            eprintln!("{CANCELLED}");
            return Ok(());
        }
        gateway = DocumentGateway::connect(&config) => gateway?,
    };
    tracing::debug!(database = %config.database, "Connected");

    let mut stdout = std::io::stdout();
    let result = tokio::select! {
        biased;
        _ = &mut cancel => {
            eprintln!("{CANCELLED}");
            Ok(())
        }
        result = commands::execute(&gateway, request, model, &mut stdout) => result,
    };

    gateway.close().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env_files();
    let args = Args::parse();
    init_tracing(args.debug);

    match run(args, tokio::signal::ctrl_c()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
