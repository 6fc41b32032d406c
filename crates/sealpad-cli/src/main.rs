//! sealpad: command-line client for password-protected encrypted notepads
//!
//! Commands:
//!   show <site>     - fetch, decrypt, and print a site's content
//!   save <site>     - replace a site's content from a file or stdin
//!   delete <site>   - delete a site after confirmation and password re-entry
//!   status <site>   - show whether a site exists and if it needs migrating
//!
//! A site argument may carry a password after `#` (the share-link form,
//! `my-notes#hunter2`); it is tried silently before any prompt. Anyone
//! holding such a link can read the site; that is the point of sharing it.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use sealpad_core::config::SealpadConfig;
use sealpad_core::SealpadError;
use sealpad_crypto::SitePassword;
use sealpad_sync::{
    BufferHost, HttpRemoteStore, NoopObserver, ReloadOutcome, SaveOutcome, SiteSession,
};

// ── CLI structure ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealpad",
    version,
    about = "Encrypted notepad client",
    long_about = "sealpad: store a password-protected blob of text on a remote site, \
                  with conflict detection so concurrent editors never silently \
                  overwrite each other"
)]
struct Cli {
    /// Path to a sealpad.toml configuration file
    #[arg(long, short = 'c', env = "SEALPAD_CONFIG")]
    config: Option<PathBuf>,

    /// Remote store base URL (overrides config)
    #[arg(long, env = "SEALPAD_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, decrypt, and print a site's content
    Show {
        /// Site id, optionally with a share-link password (`id#password`)
        site: String,
    },

    /// Replace a site's content from a file or stdin
    Save {
        /// Site id, optionally with a share-link password (`id#password`)
        site: String,
        /// Read the new content from this file instead of stdin
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
        /// Prompt for a new password and re-encrypt under it
        #[arg(long)]
        change_password: bool,
    },

    /// Delete a site (asks for confirmation and the password)
    Delete {
        site: String,
    },

    /// Show whether a site exists and if its stored format needs migrating
    Status {
        site: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SealpadConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(base_url) = cli.base_url {
        config.remote.base_url = base_url;
    }
    init_tracing(&config.log_level);

    let store = HttpRemoteStore::new(&config.remote).context("building remote store")?;
    tracing::debug!(base_url = %config.remote.base_url, "remote store configured");

    match cli.command {
        Commands::Show { site } => cmd_show(&config, store, &site).await,
        Commands::Save {
            site,
            file,
            change_password,
        } => cmd_save(&config, store, &site, file.as_deref(), change_password).await,
        Commands::Delete { site } => cmd_delete(&config, store, &site).await,
        Commands::Status { site } => cmd_status(&config, store, &site).await,
    }
}

fn init_tracing(level: &str) {
    let level = if level.is_empty() { "info" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ── Session plumbing ──────────────────────────────────────────────────────────

/// Split the share-link form `id#password` into its parts.
fn split_site(site: &str) -> (&str, Option<SitePassword>) {
    match site.split_once('#') {
        Some((id, password)) => {
            let password = (!password.is_empty()).then(|| SitePassword::new(password));
            (id, password)
        }
        None => (site, None),
    }
}

fn open_session(
    config: &SealpadConfig,
    store: HttpRemoteStore,
    site: &str,
) -> (SiteSession<HttpRemoteStore>, Arc<BufferHost>) {
    let (site_id, link_password) = split_site(site);
    let host = Arc::new(BufferHost::default());
    let session = SiteSession::new(
        store,
        host.clone(),
        Box::new(NoopObserver),
        site_id,
        link_password,
    )
    .with_kdf_iterations(config.crypto.kdf_iterations);
    (session, host)
}

/// Initialize the session and unlock it, prompting for the password when the
/// link-carried and remembered ones do not open the site.
async fn unlock(session: &mut SiteSession<HttpRemoteStore>) -> Result<()> {
    match session.init().await? {
        ReloadOutcome::Empty | ReloadOutcome::Unlocked => return Ok(()),
        ReloadOutcome::PasswordRequired | ReloadOutcome::UnsavedEdits => {}
    }

    for attempt in 1..=3 {
        let entered = rpassword::prompt_password("Password: ").context("reading password")?;
        if session.login(SitePassword::new(entered)) {
            return Ok(());
        }
        if attempt < 3 {
            eprintln!("wrong password, try again");
        }
    }
    bail!("could not unlock '{}'", session.site_id())
}

/// Prompt for a brand-new password: non-empty, entered identically twice.
fn prompt_new_password() -> Result<SitePassword> {
    for _ in 0..3 {
        let first = rpassword::prompt_password("New password: ").context("reading password")?;
        if first.is_empty() {
            eprintln!("password must not be empty");
            continue;
        }
        let second = rpassword::prompt_password("Repeat password: ").context("reading password")?;
        if first == second {
            return Ok(SitePassword::new(first));
        }
        eprintln!("passwords do not match, try again");
    }
    bail!("no matching password entered")
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;
    eprint!("{prompt} ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn cmd_show(config: &SealpadConfig, store: HttpRemoteStore, site: &str) -> Result<()> {
    let (mut session, _host) = open_session(config, store, site);
    unlock(&mut session).await?;

    if session.is_new() {
        eprintln!("'{}' has no content yet", session.site_id());
        return Ok(());
    }
    if session.needs_schema_upgrade() {
        eprintln!("note: stored under an older format; save once to migrate");
    }
    print!("{}", session.content());
    Ok(())
}

async fn cmd_save(
    config: &SealpadConfig,
    store: HttpRemoteStore,
    site: &str,
    file: Option<&std::path::Path>,
    change_password: bool,
) -> Result<()> {
    let (mut session, host) = open_session(config, store, site);
    unlock(&mut session).await?;

    let content = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading content from stdin")?;
            buf
        }
    };
    host.replace(&content);
    session.mark_edited();

    let override_password = if change_password {
        Some(prompt_new_password()?)
    } else {
        None
    };

    let outcome = match session.save(override_password).await {
        Ok(outcome) => outcome,
        Err(SealpadError::Conflict(_)) => bail!(
            "'{}' was modified in the meantime; re-run to load the latest \
             version, then save again",
            session.site_id()
        ),
        Err(e) => return Err(e).context("saving"),
    };

    match outcome {
        SaveOutcome::Saved { .. } => {
            eprintln!("saved '{}'", session.site_id());
            Ok(())
        }
        SaveOutcome::PasswordRequired => {
            // First save of a new site: establish the password now.
            let password = prompt_new_password()?;
            match session.save(Some(password)).await.context("saving")? {
                SaveOutcome::Saved { .. } => {
                    eprintln!("saved '{}'", session.site_id());
                    Ok(())
                }
                SaveOutcome::PasswordRequired => bail!("no password established"),
            }
        }
    }
}

async fn cmd_delete(config: &SealpadConfig, store: HttpRemoteStore, site: &str) -> Result<()> {
    let (mut session, _host) = open_session(config, store, site);
    session.init().await?;

    if !confirm(&format!(
        "This permanently deletes '{}'. Type 'yes' to continue:",
        session.site_id()
    ))? {
        eprintln!("aborted");
        return Ok(());
    }

    let entered = rpassword::prompt_password("Password: ").context("reading password")?;
    match session.delete(SitePassword::new(entered)).await {
        Ok(()) => {
            eprintln!("deleted '{}'", session.site_id());
            Ok(())
        }
        Err(SealpadError::Authentication) => bail!("wrong password; nothing was deleted"),
        Err(SealpadError::Conflict(_)) => bail!(
            "'{}' was modified in the meantime; re-run to load the latest \
             version before deleting",
            session.site_id()
        ),
        Err(e) => Err(e).context("deleting"),
    }
}

async fn cmd_status(config: &SealpadConfig, store: HttpRemoteStore, site: &str) -> Result<()> {
    let (mut session, _host) = open_session(config, store, site);
    session.init().await?;

    if session.is_new() {
        println!("'{}': no content stored", session.site_id());
    } else {
        println!("'{}': content stored", session.site_id());
        if session.needs_schema_upgrade() {
            println!("stored under an older format; save once to migrate");
        }
    }
    Ok(())
}
