//! get_dropbox_link CLI - Print Dropbox share links for local paths.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use get_dropbox_link::resolver::DEFAULT_POOL_SIZE;
use get_dropbox_link::{
    locate_dropbox_folder, Authenticator, Console, CredentialStore, DropboxClient, LinkError,
    LinkResolver, QuerySpec, TokenProvider,
};

/// Fetch Dropbox share links for paths inside the local Dropbox folder.
#[derive(Parser)]
#[command(name = "get_dropbox_link")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Paths to files or folders inside the Dropbox folder.
    #[arg(required = true)]
    paths: Vec<String>,

    /// Query string merged into each link (e.g. "dl=1"); "key=" removes a key.
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Use '+' instead of '%20' for spaces in the link's file name.
    #[arg(long)]
    plus_for_space: bool,

    /// Toggle verbose mode.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Number of links to request concurrently.
    #[arg(long, short = 'j', default_value_t = DEFAULT_POOL_SIZE)]
    jobs: usize,

    /// Path of the cached credentials file.
    #[arg(long, env = "GET_DROPBOX_LINK_CONFIG")]
    config: Option<PathBuf>,

    /// Path of the Dropbox desktop client's info.json.
    #[arg(long, env = "DROPBOX_INFO_FILE")]
    info_file: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

/// Exit status for an argument parsing outcome: 0 for help/version, 1 otherwise.
fn parse_error_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = parse_error_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_tracing(cli.verbose);

    // Reject a bad override before touching the network
    let query = QuerySpec::parse(cli.query.as_deref().unwrap_or_default())
        .context("Invalid --query")?;

    let store = match cli.config {
        Some(path) => CredentialStore::new(path),
        None => CredentialStore::default_location()?,
    };
    let mut credentials = store.load();

    let mut console = Console::stdio();
    store
        .ensure_app_identity(&mut credentials, &mut console)
        .context("Failed to configure the Dropbox app")?;

    let (app_key, account_kind) = match (credentials.app_key.clone(), credentials.account_kind) {
        (Some(app_key), Some(kind)) => (app_key, kind),
        _ => {
            return Err(LinkError::AppIdentityMissing("app key or account type unset".into()).into())
        }
    };

    let local_root = locate_dropbox_folder(cli.info_file.as_deref(), account_kind)?;

    let mut tokens = TokenProvider::new(Authenticator::new(app_key), store, credentials);
    tokens.acquire_refresh_token(&mut console).await?;
    let access_token = tokens.ensure_fresh_access_token().await?;

    let client = DropboxClient::new(access_token);
    let resolver = LinkResolver::new(&client, &local_root)?
        .with_query(query)
        .with_plus_for_space(cli.plus_for_space)
        .with_pool_size(cli.jobs);

    let links = resolver.resolve_batch(&cli.paths).await?;

    let mut stdout = std::io::stdout().lock();
    for link in links {
        writeln!(stdout, "{}", link.url)?;
    }

    Ok(())
}
