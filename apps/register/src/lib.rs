//! # CardPOS Register
//!
//! Terminal front end for the shop's till.
//!
//! ## Module Organization
//! ```text
//! cardpos_register/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── config.rs       ◄─── register.toml + CARDPOS_* overrides
//! ├── session.rs      ◄─── RegisterSession { actor, cart, policy }
//! ├── terminal.rs     ◄─── Line parser and read/eval loop
//! ├── commands/
//! │   ├── auth.rs     ◄─── login
//! │   ├── product.rs  ◄─── search_products
//! │   ├── cart.rs     ◄─── add / change / remove / discount / clear / get
//! │   ├── customer.rs ◄─── register / find customers
//! │   └── sale.rs     ◄─── checkout → Receipt
//! └── error.rs        ◄─── ApiError for commands, StartupError for run()
//! ```
//!
//! The register holds no business rules. Prices, discounts, stock checks
//! and the checkout transaction all live in `cardpos-core` and
//! `cardpos-db`.

pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod terminal;

use std::path::Path;

use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cardpos_db::{Database, DbConfig};
use config::RegisterConfig;
use error::StartupError;
use terminal::Terminal;

/// Runs the register on stdin/stdout until `quit` or EOF.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize logging (RUST_LOG, default info,cardpos=debug)           │
/// │  2. Load register.toml, apply CARDPOS_* overrides                       │
/// │  3. Open the database, run pending migrations                           │
/// │  4. Create the default admin/seller accounts if missing                 │
/// │  5. Hand stdin/stdout to the terminal loop                              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(config_path: Option<&Path>) -> Result<(), StartupError> {
    init_tracing();

    info!("Starting CardPOS register");

    let config = RegisterConfig::load(config_path)?;
    let policy = config.discount_policy()?;
    let db_path = config.database_path()?;
    info!(?db_path, store = %config.store.name, seller_ceiling = %policy.seller_ceiling(), "Configuration loaded");

    let db = Database::new(
        DbConfig::new(db_path).max_connections(config.database.max_connections),
    )
    .await?;
    info!("Database connected and migrations applied");

    let created = db.users().ensure_default_users().await?;
    if created > 0 {
        info!(created, "Default accounts created; change their passwords");
    }

    let mut terminal = Terminal::new(db.clone(), config, policy);
    terminal
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    db.close().await;
    info!("Register closed");
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=cardpos_db=trace` - Trace the database crate only
/// - Default: `info,cardpos=debug,sqlx=warn`
///
/// Logs go to stderr so they do not interleave with register output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cardpos=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
