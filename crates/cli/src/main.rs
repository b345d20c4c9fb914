//! Headless Kit CLI - drive a Shopify Storefront cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the persisted cart
//! hk cart show
//!
//! # Pick a variant and add it to the cart
//! hk product classic-tee --select Color=Red --select Size=M --add --quantity 2
//!
//! # Change or remove a line (line id or variant id)
//! hk cart update gid://shopify/ProductVariant/123 3
//! hk cart remove gid://shopify/CartLine/abc
//!
//! # Countdown to the configured drop
//! hk drop wait
//!
//! # Newsletter sign-up
//! hk subscribe shopper@example.com
//! ```
//!
//! Configuration comes from the environment (and `.env`); see
//! `headless_kit_storefront::config`. `RUST_LOG` controls log output and
//! `HK_LOG_JSON=1` switches logs to JSON. Logs go to stderr.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use headless_kit_storefront::config::SentryConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "hk")]
#[command(author, version, about = "Headless Kit storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the persisted cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show a product's options and optionally add the selected variant
    Product {
        /// Product handle
        handle: String,

        /// Select an option value, as `Name=Value` (repeatable)
        #[arg(short, long = "select", value_parser = parse_selection)]
        select: Vec<(String, String)>,

        /// Add the resolved variant to the cart
        #[arg(long)]
        add: bool,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        quantity: i64,

        /// Show the cart after a successful add
        #[arg(long)]
        open: bool,
    },
    /// Countdown to the configured drop
    Drop {
        #[command(subcommand)]
        action: DropAction,
    },
    /// Subscribe an email address to the newsletter
    Subscribe {
        /// Email address
        email: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Fetch and print the cart
    Show,
    /// Print the number of items in the cart
    Count,
    /// Create a new empty cart, replacing the persisted one
    Create,
    /// Add a variant to the cart, creating the cart if needed
    Add {
        /// Variant id (`gid://shopify/ProductVariant/...` or the numeric id)
        variant: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        quantity: i64,
    },
    /// Set the quantity of a line
    Update {
        /// Cart line id, or the variant id (gid or numeric) of a line in the cart
        line: String,

        /// New quantity
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Cart line id, or the variant id (gid or numeric) of a line in the cart
        line: String,
    },
    /// Print the checkout URL
    Open,
}

#[derive(Subcommand)]
enum DropAction {
    /// Print the countdown state
    Status {
        /// Only report marks hit exactly
        #[arg(long)]
        exact: bool,
    },
    /// Count down until the drop opens
    Wait,
}

fn parse_selection(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Name=Value, got `{raw}`"))?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return Err(format!("expected Name=Value, got `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SentryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.environment.clone().map(Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "headless_kit_storefront=warn,hk=info".into());

    let json = std::env::var("HK_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&SentryConfig::from_env());
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cart { action } => {
            let (_, cart) = commands::connect()?;
            match action {
                CartAction::Show => commands::cart::show(&cart).await?,
                CartAction::Count => commands::cart::count(&cart).await?,
                CartAction::Create => commands::cart::create(&cart).await?,
                CartAction::Add { variant, quantity } => {
                    commands::cart::add(&cart, &variant, quantity).await?;
                }
                CartAction::Update { line, quantity } => {
                    commands::cart::update(&cart, &line, quantity).await?;
                }
                CartAction::Remove { line } => commands::cart::remove(&cart, &line).await?,
                CartAction::Open => commands::cart::open(&cart).await?,
            }
        }
        Commands::Product {
            handle,
            select,
            add,
            quantity,
            open,
        } => {
            let add = add.then_some(commands::product::AddArgs { quantity, open });
            commands::product::show(&handle, &select, add).await?;
        }
        Commands::Drop { action } => match action {
            DropAction::Status { exact } => commands::drop_timer::status(exact)?,
            DropAction::Wait => commands::drop_timer::wait().await?,
        },
        Commands::Subscribe { email } => commands::newsletter::subscribe(&email).await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("Color = Red").unwrap(),
            ("Color".to_string(), "Red".to_string())
        );
        assert!(parse_selection("Color").is_err());
        assert!(parse_selection("=Red").is_err());
    }

    #[test]
    fn test_product_args() {
        let cli = Cli::try_parse_from([
            "hk", "product", "tee", "-s", "Color=Red", "--select", "Size=M", "--add", "-q", "2",
        ])
        .unwrap();
        let Commands::Product {
            handle,
            select,
            add,
            quantity,
            open,
        } = cli.command
        else {
            panic!("expected product command");
        };
        assert_eq!(handle, "tee");
        assert_eq!(select.len(), 2);
        assert!(add && !open);
        assert_eq!(quantity, 2);
    }

    #[test]
    fn test_rejects_zero_add_quantity() {
        assert!(Cli::try_parse_from(["hk", "cart", "add", "123", "-q", "0"]).is_err());
        assert!(Cli::try_parse_from(["hk", "cart", "update", "123", "0"]).is_ok());
    }
}
