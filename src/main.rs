use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fpsos::auth::hash_password;
use fpsos::availability::seed_slots;
use fpsos::config::ServerConfig;
use fpsos::rate_limit::spawn_sweeper;
use fpsos::server::{AppState, create_router};
use fpsos::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "fpsos")]
#[command(about = "Booking and admin backend for FPSOS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "FPSOS_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(long, short, env = "FPSOS_PORT", default_value = "3000")]
    port: u16,

    /// Data directory for the database
    #[arg(long, env = "FPSOS_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// TOML file with business hours, rate limits and mail settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Signing key for session cookies
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,

    /// Shared password for the admin password login
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Mark the session cookie Secure (serve behind HTTPS)
    #[arg(long, env = "COOKIE_SECURE")]
    cookie_secure: bool,

    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    resend_api_key: Option<String>,

    /// Recipient of order, payment and contact alerts
    #[arg(long, env = "ADMIN_NOTIFY_EMAIL")]
    admin_notify_email: Option<String>,

    /// Base URL of the Discord bot control API
    #[arg(long, env = "BOT_API_URL")]
    bot_api_url: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "NEWS_RSS_URL")]
    news_rss_url: Option<String>,

    #[arg(long, env = "PAYPAL_WEBHOOK_ID")]
    paypal_webhook_id: Option<String>,

    #[arg(long, env = "PAYPAL_CLIENT_ID")]
    paypal_client_id: Option<String>,

    #[arg(long, env = "PAYPAL_CLIENT_SECRET", hide_env_values = true)]
    paypal_client_secret: Option<String>,

    /// PayPal REST base URL (use the sandbox URL for testing)
    #[arg(long, env = "PAYPAL_API_BASE")]
    paypal_api_base: Option<String>,

    /// Accept PayPal webhooks without signature verification
    #[arg(long, env = "PAYPAL_SKIP_VERIFY")]
    paypal_skip_verify: bool,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the database
    Init {
        /// Data directory for the database
        #[arg(long, env = "FPSOS_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Create an admin user for the dashboard
    CreateUser {
        email: String,

        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,

        /// Display name
        #[arg(long, default_value = "Admin")]
        name: String,

        #[arg(long)]
        username: Option<String>,

        #[arg(long, env = "FPSOS_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Seed two weeks of default availability
    SeedAvailability {
        #[arg(long, env = "FPSOS_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
    },
}

fn open_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    fs::create_dir_all(data_dir)?;
    let store = SqliteStore::new(data_dir.join("fpsos.db"))?;
    store.initialize()?;
    Ok(store)
}

fn prompt_password() -> anyhow::Result<String> {
    let password = inquire::Password::new("Password:")
        .with_validator(|input: &str| {
            if input.chars().count() < 8 {
                Err("Password must be at least 8 characters".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;
    Ok(password)
}

fn create_user(
    store: &SqliteStore,
    email: &str,
    password: &str,
    name: &str,
    username: Option<&str>,
) -> anyhow::Result<()> {
    if store.get_user_by_email(email)?.is_some() {
        bail!("A user with email '{email}' already exists");
    }

    let hash = hash_password(password)?;
    let user = store.create_user(email, &hash, name, username)?;

    println!();
    println!("Created admin user '{}' (id {})", user.email, user.id);
    println!();
    Ok(())
}

fn run_init(data_dir: &Path, non_interactive: bool) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    println!("Database ready at {}", data_dir.join("fpsos.db").display());

    if non_interactive || store.count_users()? > 0 {
        return Ok(());
    }

    let create = inquire::Confirm::new("Would you like to create an admin user?")
        .with_default(true)
        .prompt()?;
    if !create {
        return Ok(());
    }

    let email = inquire::Text::new("Email:")
        .with_validator(|input: &str| {
            if fpsos::server::validation::is_valid_email(input) {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Err("Invalid email address".into())
            }
        })
        .prompt()?;
    let name = inquire::Text::new("Name:").with_default("Admin").prompt()?;
    let password = prompt_password()?;

    create_user(&store, &email, &password, &name, None)
}

fn build_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig {
        host: args.host,
        port: args.port,
        data_dir: args.data_dir,
        admin_secret: args.admin_secret,
        admin_password: args.admin_password,
        cookie_secure: args.cookie_secure,
        gemini_api_key: args.gemini_api_key,
        ..ServerConfig::default()
    };

    if let Some(path) = &args.config {
        config.merge_file(path)?;
    }

    config.mail.api_key = args.resend_api_key;
    if args.admin_notify_email.is_some() {
        config.mail.admin_email = args.admin_notify_email;
    }
    if let Some(url) = args.bot_api_url {
        config.bot_api_url = url;
    }
    if let Some(url) = args.news_rss_url {
        config.news_rss_url = url;
    }
    config.paypal.webhook_id = args.paypal_webhook_id;
    config.paypal.client_id = args.paypal_client_id;
    config.paypal.client_secret = args.paypal_client_secret;
    if let Some(base) = args.paypal_api_base {
        config.paypal.api_base = base;
    }
    config.paypal.skip_verify = args.paypal_skip_verify;

    Ok(config)
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = build_config(args)?;
    let store = open_store(&config.data_dir)?;

    if store.count_users()? == 0 && config.admin_password.is_none() {
        tracing::warn!(
            "No admin users and no ADMIN_PASSWORD configured. \
             Run 'fpsos admin create-user' to enable dashboard login."
        );
    }

    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(config, Arc::new(store))?);
    let _sweeper = spawn_sweeper(&state.rate_limiter);

    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fpsos=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(&data_dir, non_interactive)?,
            AdminCommands::CreateUser {
                email,
                password,
                name,
                username,
                data_dir,
            } => {
                let store = open_store(&data_dir)?;
                let password = match password {
                    Some(p) => p,
                    None => prompt_password()?,
                };
                create_user(&store, &email, &password, &name, username.as_deref())?;
            }
            AdminCommands::SeedAvailability { data_dir } => {
                let store = open_store(&data_dir)?;
                let added = seed_slots(&store, Local::now().date_naive())?;
                println!("Added {added} availability slots");
            }
        },
        Commands::Serve(args) => serve(args).await?,
    }

    Ok(())
}
