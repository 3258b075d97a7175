//! `allergen`: terminal client for the allergen lookup service.
//!
//! # Usage
//!
//! ```sh
//! allergen login alice
//! allergen lookup A1-0456
//! allergen allergens add 3 7
//! allergen open /settings/history
//! ```
//!
//! The session cookie is kept in a small TOML state file between runs.

mod app;
mod cache;
mod client;
mod router;
mod views;

use std::{
  io::{self, BufRead, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use client::{AllergenDraft, ApiClient, ProductDraft, ProfileUpdate, Registration};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "allergen", about = "Check food products against your allergens")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the allergen server (default: http://localhost:5000).
  #[arg(long, env = "ALLERGEN_URL")]
  url: Option<String>,

  /// Where the session cookie is kept between runs.
  #[arg(long, env = "ALLERGEN_STATE_FILE", value_name = "FILE")]
  state_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the page at a client location, e.g. `/home` or `/product/A1-0456`.
  Open { location: String },
  /// Create an account. The password is read from stdin.
  Register { username: String, email: String, full_name: String },
  /// Log in. The password is read from stdin.
  Login { username: String },
  Logout,
  /// Analyse a product by registration number.
  Lookup { registration_number: String },
  /// Search products by name.
  Search { name: String },
  /// List, add, or remove your allergens.
  Allergens {
    #[command(subcommand)]
    action: Option<AllergenAction>,
  },
  Profile {
    #[command(subcommand)]
    action: Option<ProfileAction>,
  },
  /// Show your recent lookups.
  History {
    #[arg(short, long, default_value_t = 5)]
    limit: usize,
  },
  /// Catalog administration.
  Admin {
    #[command(subcommand)]
    action: Option<AdminAction>,
  },
}

#[derive(Subcommand, Debug)]
enum AllergenAction {
  List,
  Add { ids: Vec<i64> },
  Remove { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
  Show,
  Edit {
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    email:     Option<String>,
  },
}

#[derive(Subcommand, Debug)]
enum AdminAction {
  Users,
  Products,
  AddAllergen { name: String, icon: String, description: String },
  AddProduct {
    name:                String,
    manufacturer:        String,
    registration_number: String,
    ingredients:         String,
  },
  /// Attach allergens to a product.
  Link { product_id: i64, allergen_ids: Vec<i64> },
  /// Record safer alternatives for a product.
  Alternatives { product_id: i64, alternative_ids: Vec<i64> },
}

// ─── Config and state files ───────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

/// Persisted between runs.
#[derive(Serialize, Deserialize, Default)]
struct StateFile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  session: Option<String>,
}

fn default_state_path() -> PathBuf {
  let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
  home.join(".allergen-session.toml")
}

fn load_state(path: &Path) -> Result<StateFile> {
  match std::fs::read_to_string(path) {
    Ok(raw) => toml::from_str(&raw).with_context(|| format!("parsing state file {}", path.display())),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StateFile::default()),
    Err(e) => Err(e).with_context(|| format!("reading state file {}", path.display())),
  }
}

fn save_state(path: &Path, state: &StateFile) -> Result<()> {
  let raw = toml::to_string(state).context("encoding state file")?;
  std::fs::write(path, raw).with_context(|| format!("writing state file {}", path.display()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:5000".to_string());

  let state_path = args.state_file.unwrap_or_else(default_state_path);
  let state = load_state(&state_path)?;

  let app = App::new(ApiClient::new(base_url, state.session)?);
  let outcome = run(&app, args.command).await;

  // Persist whatever the server left us with, even when the command failed.
  save_state(&state_path, &StateFile { session: app.client.session() })?;

  let output = outcome?;
  print!("{output}");
  Ok(())
}

async fn run(app: &App, command: Command) -> Result<String> {
  let output = match command {
    Command::Open { location } => open(app, &location).await?,

    Command::Register { username, email, full_name } => {
      let password = read_password()?;
      let next = app.register(&Registration { username, password, email, full_name }).await?;
      open(app, next).await?
    }
    Command::Login { username } => {
      let password = read_password()?;
      let next = app.login(&username, &password).await?;
      open(app, next).await?
    }
    Command::Logout => line(app.logout().await?),

    Command::Lookup { registration_number } => {
      open(app, &format!("/product/{registration_number}")).await?
    }
    Command::Search { name } => views::search_results(&name, &app.search(&name).await?),

    Command::Allergens { action } => match action.unwrap_or(AllergenAction::List) {
      AllergenAction::List => open(app, "/profile/allergens").await?,
      AllergenAction::Add { ids } => line(app.add_allergens(&ids).await?),
      AllergenAction::Remove { id } => line(app.remove_allergen(id).await?),
    },

    Command::Profile { action } => match action.unwrap_or(ProfileAction::Show) {
      ProfileAction::Show => open(app, "/profile").await?,
      ProfileAction::Edit { full_name, email } => {
        let user = app.update_profile(&ProfileUpdate { full_name, email }).await?;
        views::edit_profile(&user)
      }
    },

    Command::History { limit } => views::history_list("Search history", &app.history(limit).await?),

    Command::Admin { action } => match action {
      None => open(app, "/admin").await?,
      Some(AdminAction::Users) => {
        let mut out = String::new();
        for u in app.users().await? {
          out.push_str(&format!("{:>3}  {:<16} {}\n", u.id, u.username, u.email));
        }
        out
      }
      Some(AdminAction::Products) => {
        let products = app.products().await?;
        views::search_results("", &products)
      }
      Some(AdminAction::AddAllergen { name, icon, description }) => {
        let allergen = app.create_allergen(&AllergenDraft { name, icon, description }).await?;
        line(format!("Created allergen {} ({})", allergen.id, allergen.name))
      }
      Some(AdminAction::AddProduct { name, manufacturer, registration_number, ingredients }) => {
        let draft = ProductDraft { name, manufacturer, registration_number, ingredients };
        let product = app.create_product(&draft).await?;
        line(format!("Created product {} ({})", product.id, product.registration_number))
      }
      Some(AdminAction::Link { product_id, allergen_ids }) => {
        line(app.link_product_allergens(product_id, &allergen_ids).await?)
      }
      Some(AdminAction::Alternatives { product_id, alternative_ids }) => {
        line(app.link_alternatives(product_id, &alternative_ids).await?)
      }
    },
  };
  Ok(output)
}

/// Navigate and render, noting when the guard sent us elsewhere.
async fn open(app: &App, location: &str) -> Result<String> {
  let (landed, page) = app.navigate(location).await?;
  if landed == router::Page::resolve(location).location() {
    Ok(page)
  } else {
    Ok(format!("(redirected to {landed})\n\n{page}"))
  }
}

fn line(message: String) -> String { format!("{message}\n") }

/// Read a password from stdin.
fn read_password() -> Result<String> {
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut input = String::new();
  io::stdin().lock().read_line(&mut input).context("reading password")?;
  Ok(input.trim_end_matches(['\n', '\r']).to_string())
}
