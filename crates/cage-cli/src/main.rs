//! Cage CLI
//!
//! Administration commands that run against the configured SQLite database:
//! creating and resetting the schema, bootstrapping accounts, and listing the
//! permission flags and renderers a client can use.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cage::core::{PermissionValue, UserId};
use cage::store::{MemoryStore, SqliteStore, Store, UpdateResult};
use cage::{Actor, Cms, CmsConfig, NewUser};

#[derive(Parser)]
#[command(name = "cage")]
#[command(about = "Administer a Cage blog backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML). Overrides --preset.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Built-in configuration preset
    #[arg(long, global = true, default_value = "development")]
    preset: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    InitDb,

    /// Drop every table and recreate the schema
    ResetDb {
        /// Confirm that all data should be deleted
        #[arg(long)]
        yes: bool,
    },

    /// Create a user account
    CreateUser {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        password: String,

        /// Permission preset for the new account
        #[arg(long, value_enum, default_value = "author")]
        preset: RolePreset,
    },

    /// List permission groups and flags
    Permissions {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered renderers
    Renderers,

    /// Render a source file (or stdin) to HTML
    Render {
        /// Renderer extension
        #[arg(long, default_value = "md")]
        ext: String,

        /// Source file; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RolePreset {
    Superuser,
    Author,
    None,
}

impl RolePreset {
    fn value(self) -> PermissionValue {
        match self {
            RolePreset::Superuser => PermissionValue::SUPERUSER,
            RolePreset::Author => PermissionValue::AUTHOR,
            RolePreset::None => PermissionValue::EMPTY,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), &cli.preset)?;

    match cli.command {
        Commands::InitDb => init_db(config).await,
        Commands::ResetDb { yes } => reset_db(&config, yes).await,
        Commands::CreateUser {
            id,
            name,
            password,
            preset,
        } => create_user(config, id, name, password, preset).await,
        Commands::Permissions { json } => permissions(config, json),
        Commands::Renderers => renderers(config),
        Commands::Render { ext, file } => render(config, &ext, file.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, preset: &str) -> anyhow::Result<CmsConfig> {
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            CmsConfig::load(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => match CmsConfig::preset(preset) {
            Some(config) => config,
            None => bail!("unknown preset `{preset}` (expected production, development or testing)"),
        },
    };
    config.validate()?;
    Ok(config)
}

/// The account the CLI acts as. Holds every flag.
fn operator() -> Actor {
    Actor::user(UserId::new("cage-cli"), "cage-cli", PermissionValue::SUPERUSER)
}

async fn init_db(config: CmsConfig) -> anyhow::Result<()> {
    let path = config.database_path.clone();
    let cms = Cms::open(config)?;
    let users = cms.store().count_users().await?;
    cms.shutdown().await;

    println!("database ready at {} ({users} users)", path.display());
    Ok(())
}

async fn reset_db(config: &CmsConfig, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!(
            "refusing to reset {} without --yes",
            config.database_path.display()
        );
    }
    if let Some(dir) = config.database_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let store = SqliteStore::open(&config.database_path)?;
    store.reset().await?;

    println!("database at {} has been reset", config.database_path.display());
    Ok(())
}

async fn create_user(
    config: CmsConfig,
    id: String,
    name: String,
    password: String,
    preset: RolePreset,
) -> anyhow::Result<()> {
    let cms = Cms::open(config)?;
    let operator = operator();

    let permission = cms
        .permissions()
        .names(preset.value())
        .into_iter()
        .map(str::to_string)
        .collect();
    let view = cms
        .add_user(&operator, NewUser {
            id,
            name,
            password,
            permission,
            expired: false,
        })
        .await?;

    // Flag names only cover defined bits; a superuser holds all of them.
    if preset == RolePreset::Superuser {
        let user_id = UserId::new(view.id.clone());
        if let Some(mut user) = cms.store().get_user(&user_id).await? {
            user.permission = PermissionValue::SUPERUSER;
            if cms.store().update_user(&user).await? != UpdateResult::Updated {
                bail!("user {user_id} disappeared while being promoted");
            }
        }
    }
    cms.shutdown().await;

    println!("created user {} ({}) as {:?}", view.id, view.name, preset);
    Ok(())
}

fn permissions(config: CmsConfig, json: bool) -> anyhow::Result<()> {
    let cms = in_memory(config)?;
    let groups = cms.permission_groups();

    if json {
        println!("{}", serde_json::to_string_pretty(groups)?);
        return Ok(());
    }
    for group in groups {
        println!("{}", group.name());
        for flag in group.flags() {
            println!("  {:<24} {}", flag.name(), flag.description());
        }
    }
    Ok(())
}

fn renderers(config: CmsConfig) -> anyhow::Result<()> {
    let cms = in_memory(config)?;
    for info in cms.renderers().renderers() {
        println!("{:<8} {:<12} {}", info.ext, info.name, info.description);
    }
    Ok(())
}

fn render(config: CmsConfig, ext: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let source = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            source
        }
    };

    let cms = in_memory(config)?;
    let html = cms.renderers().render(ext, &source)?;
    print!("{html}");
    Ok(())
}

/// A Cms over an empty in-memory store, for commands that only need the
/// registries.
fn in_memory(config: CmsConfig) -> anyhow::Result<Cms> {
    let cms = Cms::builder(Arc::new(MemoryStore::new()))
        .config(CmsConfig {
            event_queue_capacity: 0,
            ..config
        })
        .build()?;
    Ok(cms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_user_defaults_to_author() {
        let cli = Cli::try_parse_from([
            "cage",
            "create-user",
            "--id",
            "alice",
            "--name",
            "Alice",
            "--password",
            "password-123",
        ])
        .unwrap();
        match cli.command {
            Commands::CreateUser { preset, .. } => assert_eq!(preset, RolePreset::Author),
            _ => panic!("wrong command"),
        }
        assert_eq!(cli.preset, "development");
    }

    #[test]
    fn test_reset_requires_flag_value() {
        let cli = Cli::try_parse_from(["cage", "reset-db"]).unwrap();
        assert!(matches!(cli.command, Commands::ResetDb { yes: false }));
    }

    #[test]
    fn test_presets() {
        assert_eq!(RolePreset::None.value(), PermissionValue::EMPTY);
        assert_eq!(RolePreset::Superuser.value(), PermissionValue::SUPERUSER);
        assert!(load_config(None, "testing").is_ok());
        assert!(load_config(None, "staging").is_err());
    }
}
