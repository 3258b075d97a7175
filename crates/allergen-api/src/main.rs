//! allergen-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `ALLERGEN_*` environment variables, opens the SQLite store, optionally
//! seeds the starter catalog, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! ```sh
//! cargo run -p allergen-api --bin allergen-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use allergen_api::{AppState, ServerConfig};
use allergen_core::{password, seed, store::AllergenStore};
use allergen_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Allergen lookup API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Seed the admin account and starter catalog before serving.
  #[arg(long)]
  seed: bool,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let plaintext = read_password()?;
    let hash = password::hash_password(&plaintext).context("failed to hash password")?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ALLERGEN"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate().context("invalid server configuration")?;

  let db_path = expand_tilde(&server_cfg.database_path);
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open store at {db_path:?}"))?;

  if cli.seed || server_cfg.seed {
    let report = seed::seed_catalog(&store, &server_cfg.admin_password)
      .await
      .context("failed to seed catalog")?;
    tracing::info!(admin_created = report.admin_created, "seeding finished");
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let prune_every = Duration::from_secs(server_cfg.session_prune_interval_secs.max(1));
  let state = AppState::new(store, server_cfg);

  tokio::spawn(prune_sessions(Arc::clone(&state.store), prune_every));

  let app = allergen_api::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Delete expired sessions every `every`, for the life of the process.
async fn prune_sessions(store: Arc<SqliteStore>, every: Duration) {
  let mut ticker = tokio::time::interval(every);
  loop {
    ticker.tick().await;
    match store.prune_sessions().await {
      Ok(0) => {}
      Ok(removed) => tracing::debug!(removed, "pruned expired sessions"),
      Err(e) => tracing::warn!(error = %e, "session prune failed"),
    }
  }
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
