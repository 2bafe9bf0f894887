//! VivaMais Turismo CLI - Catalog browsing, favorites and site forms.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! viva experiences --kind natureza --weekend
//! viva experience exp1
//! viva destinations
//! viva blog --category "roteiros prontos"
//!
//! # Manage favorites (needs VIVA_PROVIDER_CONFIG)
//! viva favorites add exp1
//! viva favorites list
//!
//! # Submit the site's forms
//! viva newsletter ana@example.com
//! ```
//!
//! # Commands
//!
//! - `experiences`, `experience`, `destinations`, `blog` - Catalog
//! - `favorites list|add|remove`, `whoami`, `sign-out` - Visitor session
//! - `trip-request`, `contact`, `newsletter` - Forms
//!
//! # Environment Variables
//!
//! Session variables are documented in `viva_mais_sync::config`. In addition:
//!
//! - `SENTRY_DSN` - Forward warnings and errors to Sentry
//! - `VIVA_LOG_JSON` - Emit logs as JSON
//! - `RUST_LOG` - Log filter (default: `warn,viva_mais=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viva_mais_core::catalog::Catalog;
use viva_mais_core::forms::ContactForm;
use viva_mais_sync::{Session, SessionConfig};

mod commands;

use commands::catalog::FilterArgs;
use commands::forms::TripRequestArgs;

#[derive(Parser)]
#[command(name = "viva")]
#[command(author, version, about = "VivaMais Turismo command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List experiences, optionally filtered
    Experiences {
        /// Experience type (natureza, cultural, gastronomica, aventura, relaxamento)
        #[arg(short, long)]
        kind: Option<String>,

        /// Exact duration in days
        #[arg(short, long, conflicts_with = "weekend")]
        days: Option<u8>,

        /// Only short trips (three days or fewer)
        #[arg(short, long)]
        weekend: bool,

        /// Budget range (2000, 2000-4000, 4000-6000, 6000+)
        #[arg(short, long)]
        budget: Option<String>,

        /// Text to look for in the itinerary (e.g. "fácil")
        #[arg(long)]
        difficulty: Option<String>,
    },
    /// Show one experience
    Experience {
        /// Experience id (e.g. exp1)
        id: String,
    },
    /// List destinations
    Destinations,
    /// List blog articles
    Blog {
        /// Category (dicas, roteiros prontos, seguranca, epocas ideais)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Manage the visitor's favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show the visitor identity
    Whoami,
    /// End the visitor session
    SignOut,
    /// Request a custom trip
    TripRequest {
        #[arg(long)]
        destination: String,

        /// Travel date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Preferred experience type; repeat for several
        #[arg(long = "preference")]
        preferences: Vec<String>,

        /// Traveler profile (familia, casal, solo, aventura)
        #[arg(long)]
        profile: Option<String>,

        /// Estimated budget
        #[arg(long)]
        budget: String,
    },
    /// Send a message to the agency
    Contact {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        message: String,
    },
    /// Subscribe to the newsletter
    Newsletter {
        /// Email address
        email: String,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites
    List,
    /// Add an experience
    Add {
        /// Experience id
        id: String,
    },
    /// Remove an experience
    Remove {
        /// Experience id
        id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN")
        .ok()
        .filter(|v| !v.trim().is_empty())?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

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
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,viva_mais=info".into());
    let json = std::env::var_os("VIVA_LOG_JSON").is_some();

    // Logs go to stderr; stdout is the command's output.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env before reading SENTRY_DSN (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::builtin();
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Experiences {
            kind,
            days,
            weekend,
            budget,
            difficulty,
        } => commands::catalog::experiences(
            &mut out,
            &catalog,
            FilterArgs {
                kind,
                days,
                weekend,
                budget,
                difficulty,
            },
        )?,
        Commands::Experience { id } => commands::catalog::experience(&mut out, &catalog, &id)?,
        Commands::Destinations => commands::catalog::destinations(&mut out, &catalog)?,
        Commands::Blog { category } => {
            commands::catalog::blog(&mut out, &catalog, category.as_deref())?;
        }
        Commands::Favorites { action } => {
            let session = commands::ready_session().await?;
            match action {
                FavoritesAction::List => {
                    commands::favorites::list(&mut out, &session, &catalog).await?;
                }
                FavoritesAction::Add { id } => {
                    commands::favorites::add(&mut out, &session, &catalog, &id).await?;
                }
                FavoritesAction::Remove { id } => {
                    commands::favorites::remove(&mut out, &session, &id).await?;
                }
            }
        }
        Commands::Whoami => {
            commands::favorites::whoami(&mut out, &commands::ready_session().await?)?;
        }
        Commands::SignOut => {
            commands::favorites::sign_out(&mut out, &commands::ready_session().await?).await?;
        }
        Commands::TripRequest {
            destination,
            date,
            preferences,
            profile,
            budget,
        } => commands::forms::trip_request(
            &mut out,
            &forms_session()?,
            TripRequestArgs {
                destination,
                date,
                preferences,
                profile,
                budget,
            },
        )?,
        Commands::Contact {
            name,
            email,
            message,
        } => commands::forms::contact(
            &mut out,
            &forms_session()?,
            ContactForm {
                name,
                email,
                message,
            },
        )?,
        Commands::Newsletter { email } => {
            commands::forms::newsletter(&mut out, &forms_session()?, &email)?;
        }
    }
    Ok(())
}

/// Forms only need the notifier, so they run against an offline session.
fn forms_session() -> Result<Session, viva_mais_sync::config::ConfigError> {
    Ok(Session::offline(SessionConfig::from_env()?))
}
