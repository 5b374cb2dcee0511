//! CLI administration tool for link-resolver.
//!
//! Runs the redirect decision pipeline and the domain router offline, so
//! operators can see where a link or host would send a visitor without
//! recording a click.
//!
//! # Usage
//!
//! ```bash
//! # Dry-run a short code as an iPhone visitor from the US
//! cargo run --bin link-admin -- resolve promo --user-agent "Mozilla/5.0 (iPhone; ...)" --country US
//!
//! # Show the native-app URI for a web URL
//! cargo run --bin link-admin -- deeplink https://youtu.be/dQw4w9WgXcQ --platform android
//!
//! # Show how a host/path pair is routed
//! cargo run --bin link-admin -- route brand.example /promo
//!
//! # Check database connection
//! cargo run --bin link-admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required for `resolve`, `route` and `db`)
//! - `PLATFORM_DOMAINS`, `HYBRID_DOMAIN` (used by `route`)

use link_resolver::application::services::{
    BackoffRetrier, DomainRoutingService, DomainRoutingSettings, RetryPolicy, RouteDecision,
};
use link_resolver::domain::entities::Link;
use link_resolver::domain::repositories::LinkRepository;
use link_resolver::domain::user_agent::{Platform, UserAgentInfo};
use link_resolver::domain::variant::{AB_DRAW_RANGE, SelectionContext};
use link_resolver::domain::{deep_link, policy, variant};
use link_resolver::infrastructure::cache::NullCache;
use link_resolver::infrastructure::persistence::{PgDomainRepository, PgLinkRepository};
use link_resolver::utils::extract_domain::normalize_host;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dialoguer::Password;
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for inspecting link-resolver decisions.
#[derive(Parser)]
#[command(name = "link-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Dry-run the decision pipeline for a short code (no click is recorded)
    Resolve {
        code: String,

        /// Visitor user agent
        #[arg(short, long)]
        user_agent: Option<String>,

        /// Visitor country (ISO 3166-1 alpha-2)
        #[arg(short, long)]
        country: Option<String>,

        /// Link password; prompted for when the link needs one
        #[arg(short, long)]
        password: Option<String>,

        /// Fixed A/B draw in [0, 100) instead of a random one
        #[arg(long)]
        draw: Option<f64>,
    },

    /// Translate a web URL into a native-app URI
    Deeplink {
        url: String,

        /// Target platform
        #[arg(short, long, value_enum, conflicts_with = "user_agent")]
        platform: Option<PlatformArg>,

        /// Derive the platform from a user agent
        #[arg(short, long)]
        user_agent: Option<String>,
    },

    /// Show how a host and path are routed
    Route { host: String, path: String },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PlatformArg {
    Ios,
    Android,
    Desktop,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Ios => Platform::Ios,
            PlatformArg::Android => Platform::Android,
            PlatformArg::Desktop => Platform::Other,
        }
    }
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show table sizes
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            code,
            user_agent,
            country,
            password,
            draw,
        } => {
            let pool = connect().await?;
            resolve(&pool, &code, user_agent, country, password, draw).await?
        }
        Commands::Deeplink {
            url,
            platform,
            user_agent,
        } => deeplink(&url, platform, user_agent),
        Commands::Route { host, path } => {
            let pool = connect().await?;
            route(&pool, &host, &path).await
        }
        Commands::Db { action } => {
            let pool = connect().await?;
            handle_db_action(action, &pool).await?
        }
    }

    Ok(())
}

async fn connect() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")
}

/// Walks the same pipeline as `GET /s/{code}`: lookup, policy, password,
/// variant selection and deep-link translation.
async fn resolve(
    pool: &PgPool,
    code: &str,
    user_agent: Option<String>,
    country: Option<String>,
    password: Option<String>,
    draw: Option<f64>,
) -> Result<()> {
    println!("{}", "🔎 Resolve".bright_blue().bold());
    println!();

    let repo = PgLinkRepository::new(Arc::new(pool.clone()));
    let link = repo
        .find_by_code(code)
        .await
        .map_err(|e| anyhow::anyhow!("Lookup failed: {}", e))?;

    let Some(link) = link else {
        println!("  {} {}", "✗".red(), "not_found: This link does not exist".red());
        return Ok(());
    };

    print_link(&link);

    let now = Utc::now();
    let mut resolution = match policy::evaluate(&link, now) {
        Ok(resolution) => resolution,
        Err(e) => {
            println!("  {} {}: {}", "✗".red(), e.code().red().bold(), e);
            return Ok(());
        }
    };

    if resolution.requires_password {
        let submitted = match password {
            Some(p) => p,
            None => Password::new()
                .with_prompt("Link password")
                .allow_empty_password(true)
                .interact()?,
        };

        if link.password.as_deref() != Some(submitted.as_str()) {
            println!("  {} {}", "✗".red(), "password_required: wrong password".yellow());
            return Ok(());
        }

        resolution = match policy::evaluate_unlocked(&link, now) {
            Ok(resolution) => resolution,
            Err(e) => {
                println!("  {} {}: {}", "✗".red(), e.code().red().bold(), e);
                return Ok(());
            }
        };
        println!("  {} password accepted", "✓".green());
    }

    let ctx = SelectionContext {
        user_agent: UserAgentInfo::parse(user_agent.as_deref()),
        country: country.map(|c| c.trim().to_ascii_uppercase()),
    };
    let draw = draw.unwrap_or_else(|| rand::rng().random_range(0.0..AB_DRAW_RANGE));

    println!(
        "  Visitor: {} / {} / country {}",
        ctx.user_agent.device.as_str().cyan(),
        ctx.user_agent.os.cyan(),
        ctx.country.as_deref().unwrap_or("-").cyan()
    );
    println!("  Base URL: {}", resolution.base_url.bright_black());
    println!("  A/B draw: {:.2}", draw);

    match variant::select_destination(&link, &resolution.base_url, &ctx, draw) {
        Ok(final_url) => {
            println!();
            println!("  {} {}", "→".green().bold(), final_url.bright_white().bold());

            match deep_link::translate(&final_url, ctx.user_agent.platform) {
                Some(uri) => println!(
                    "  {} {} ({})",
                    "📱".normal(),
                    uri.bright_yellow(),
                    deep_link::app_name(&final_url).unwrap_or("app")
                ),
                None => println!("  {}", "No deep link for this visitor".bright_black()),
            }
        }
        Err(e) => println!("  {} {}: {}", "✗".red(), e.code().red().bold(), e),
    }
    println!();

    Ok(())
}

fn print_link(link: &Link) {
    println!("  Code:    {}", link.short_code.cyan());
    println!("  ID:      {}", link.id.to_string().bright_black());
    println!("  Target:  {}", link.original_url);
    println!(
        "  Clicks:  {}{}",
        link.clicks,
        link.max_clicks
            .map(|max| format!(" / {max}"))
            .unwrap_or_default()
    );
    if let Some(expiration) = link.expiration_date {
        println!("  Expires: {}", expiration.format("%Y-%m-%d %H:%M"));
    }
    if let Some(start) = link.start_date {
        println!("  Starts:  {}", start.format("%Y-%m-%d %H:%M"));
    }
    if link.is_password_protected() {
        println!("  {}", "Password protected".yellow());
    }
    println!();
}

fn deeplink(url: &str, platform: Option<PlatformArg>, user_agent: Option<String>) {
    let platform = match (platform, user_agent) {
        (Some(p), _) => Platform::from(p),
        (None, Some(ua)) => UserAgentInfo::parse(Some(&ua)).platform,
        (None, None) => Platform::Ios,
    };

    match deep_link::translate(url, platform) {
        Some(uri) => {
            println!(
                "{} {}",
                deep_link::app_name(url).unwrap_or("app").cyan().bold(),
                format!("({platform:?})").bright_black()
            );
            println!("  {}", uri.bright_yellow());
        }
        None => println!("{}", "No deep link for this URL and platform".yellow()),
    }
}

async fn route(pool: &PgPool, host: &str, path: &str) {
    let settings = DomainRoutingSettings {
        platform_domains: std::env::var("PLATFORM_DOMAINS")
            .unwrap_or_default()
            .split(',')
            .map(normalize_host)
            .filter(|d| !d.is_empty())
            .collect(),
        hybrid_domain: std::env::var("HYBRID_DOMAIN")
            .ok()
            .map(|d| normalize_host(&d))
            .filter(|d| !d.is_empty()),
        cache_ttl_seconds: 1,
    };

    let routing = DomainRoutingService::new(
        Arc::new(PgDomainRepository::new(Arc::new(pool.clone()))),
        Arc::new(NullCache::new()),
        BackoffRetrier::new(RetryPolicy::edge()),
        settings,
    );

    let host = normalize_host(host);
    let (path, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };

    match routing.route(&host, path, query).await {
        RouteDecision::PassThrough => {
            println!("{} {}{}", "pass".green().bold(), host.cyan(), path)
        }
        RouteDecision::Rewrite(target) => println!(
            "{} {}{} {} {}",
            "rewrite".yellow().bold(),
            host.cyan(),
            path,
            "→".bright_black(),
            target.bright_white().bold()
        ),
    }
}

/// Dispatches database operation commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔌 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .context("Database query failed")?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "🗄  Database Info".bright_blue().bold());
            println!();

            for table in ["links", "link_clicks", "domain_bindings", "profiles"] {
                let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                    .fetch_one(pool)
                    .await
                    .with_context(|| format!("Failed to count {table}"))?;

                println!("  {:<16} {}", table, count.to_string().bright_white().bold());
            }
            println!();
        }
    }

    Ok(())
}
