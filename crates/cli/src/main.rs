//! Stockcount CLI - inventory counting from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in; the session is kept under STOCKCOUNT_STATE_DIR
//! stockcount login -e clerk@example.com
//!
//! # Refresh every cache from the backend
//! stockcount sync
//!
//! # Open a period and count a product
//! stockcount periods create -n "March" -s 2024-03-01
//! stockcount records set 3 10 14
//!
//! # Attach an image while creating a product
//! stockcount products create -n Cola -p 1.50 -c 2 --image-url https://cdn.example.com/cola.png
//! ```
//!
//! # Environment Variables
//!
//! - `STOCKCOUNT_API_URL` - Inventory backend base URL (required)
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY` - Auth provider project (required)
//! - `STOCKCOUNT_PASSWORD` - Password for `login`/`signup` when `-p` is omitted
//! - `STOCKCOUNT_LOG_JSON` - Emit logs as JSON
//! - `RUST_LOG` - Log filter

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use stockcount_client::{AppContext, ClientConfig};
use stockcount_core::{CategoryId, ImageId, PeriodId, Price, ProductId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use error::CliError;
use output::Output;

#[derive(Parser)]
#[command(name = "stockcount")]
#[command(author, version, about = "Inventory counting client")]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login(Credentials),
    /// Create an account
    Signup(Credentials),
    /// Sign out and drop every cached entity
    Logout,
    /// Show the session and what is cached
    Status,
    /// Restore the session and refresh every cache
    Sync,
    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage products and their images
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage counting periods
    Periods {
        #[command(subcommand)]
        action: PeriodAction,
    },
    /// Record counted quantities
    Records {
        #[command(subcommand)]
        action: RecordAction,
    },
}

#[derive(Args)]
struct Credentials {
    /// Account email address
    #[arg(short, long)]
    email: String,

    /// Account password
    #[arg(short, long, env = "STOCKCOUNT_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args)]
struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Page size (defaults to `STOCKCOUNT_PAGE_SIZE`)
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Subcommand)]
enum CategoryAction {
    /// List categories
    List(PageArgs),
    /// Create a category
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Rename or describe a category
    Update {
        id: CategoryId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },
    /// Delete a category
    Delete { id: CategoryId },
}

#[derive(Args)]
struct ImageArgs {
    /// Attach an image by URL after saving
    #[arg(long, conflicts_with = "image_file")]
    image_url: Option<String>,

    /// Upload an image file after saving
    #[arg(long)]
    image_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List(PageArgs),
    /// Show one product
    Show { id: ProductId },
    /// Create a product
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        price: Price,
        /// Category IDs
        #[arg(short, long = "category")]
        categories: Vec<CategoryId>,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Update a product
    Update {
        id: ProductId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        price: Option<Price>,
        /// Replace the category IDs
        #[arg(short, long = "category")]
        categories: Option<Vec<CategoryId>>,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Delete a product
    Delete { id: ProductId },
    /// Counted quantities across periods
    History { id: ProductId },
    /// Manage a product's images
    Images {
        #[command(subcommand)]
        action: ImageAction,
    },
}

#[derive(Subcommand)]
enum ImageAction {
    /// Attach an image by URL
    Add { id: ProductId, url: String },
    /// Upload an image file
    Upload { id: ProductId, file: PathBuf },
    /// Remove an image
    Delete { id: ProductId, image: ImageId },
    /// Set the display order
    Reorder {
        id: ProductId,
        #[arg(required = true)]
        order: Vec<ImageId>,
    },
}

#[derive(Subcommand)]
enum PeriodAction {
    /// List periods
    List,
    /// Show the period open for counting
    Active,
    /// Open a new period
    Create {
        #[arg(short, long)]
        name: String,
        /// First day, `YYYY-MM-DD`
        #[arg(short, long)]
        start_date: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Update a period
    Update {
        id: PeriodId,
        #[arg(short, long)]
        name: Option<String>,
        /// Last day, `YYYY-MM-DD`
        #[arg(short, long)]
        end_date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Close a period for counting
    Close { id: PeriodId },
    /// Delete a period
    Delete { id: PeriodId },
}

#[derive(Subcommand)]
enum RecordAction {
    /// Records of one period
    List { period: PeriodId },
    /// The active period and its records
    Current,
    /// Set a product's counted quantity
    Set {
        period: PeriodId,
        product: ProductId,
        quantity: i32,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a product's record
    Delete { period: PeriodId, product: ProductId },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let out = Output::new(cli.json);

    match run(cli.command, &out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            out.error(&e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays parseable.
fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stockcount_client=info,stockcount_cli=info".into());

    let json = std::env::var_os("STOCKCOUNT_LOG_JSON").is_some();
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(command: Commands, out: &Output) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let ctx = AppContext::from_config(&config)?;
    ctx.rehydrate().await?;
    if needs_fresh_session(&command) {
        ctx.auth().refresh_if_expired().await;
    }

    let result = dispatch(&ctx, command, out).await;
    // Snapshots are written after every change; this only catches stragglers.
    if let Err(e) = ctx.teardown().await {
        tracing::warn!(error = %e, "failed to flush snapshots");
    }
    result
}

/// Commands that call the backend with the stored token. `sync` restores
/// the session itself and the session commands need no live token.
const fn needs_fresh_session(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Login(_)
            | Commands::Signup(_)
            | Commands::Logout
            | Commands::Status
            | Commands::Sync
    )
}

async fn dispatch(ctx: &AppContext, command: Commands, out: &Output) -> Result<(), CliError> {
    match command {
        Commands::Login(creds) => {
            commands::auth::login(ctx, out, &creds.email, &SecretString::from(creds.password))
                .await
        }
        Commands::Signup(creds) => {
            commands::auth::signup(ctx, out, &creds.email, &SecretString::from(creds.password))
                .await
        }
        Commands::Logout => commands::auth::logout(ctx, out).await,
        Commands::Status => commands::auth::status(ctx, out).await,
        Commands::Sync => commands::sync::run(ctx, out).await,
        Commands::Categories { action } => commands::categories::run(ctx, out, action).await,
        Commands::Products { action } => commands::products::run(ctx, out, action).await,
        Commands::Periods { action } => commands::periods::run(ctx, out, action).await,
        Commands::Records { action } => commands::records::run(ctx, out, action).await,
    }
}
