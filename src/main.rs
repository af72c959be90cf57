use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use pis::config::{self, LATEST_CONFIG_URL};
use pis::index::ReqwestClient;
use pis::install::PipInstaller;
use pis::pipeline::Pipeline;
use pis::update::with_latest_config;
use pis::vcs::CommandCloner;

#[derive(Parser)]
#[command(name = "pis")]
#[command(
    version,
    about = "Install python package as cloned repo from guessed VCS (git, hg, etc.) repository."
)]
struct Cli {
    /// Names of the packages to install
    pkg_names: Vec<String>,

    /// Directory the repositories are cloned into [default: current directory]
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Merge the latest published host mapping into the user config first
    #[arg(long)]
    update_config: bool,

    /// Log every clone attempt
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_dir = config::user_config_dir();

    if let Err(e) = pis::logging::init(&config_dir, cli.verbose) {
        eprintln!("pis: failed to initialize logging: {e:#}");
    }

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")
        .and_then(|runtime| runtime.block_on(run(cli, &config_dir)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config_dir: &Path) -> anyhow::Result<()> {
    let (mut config, user_path) = config::load_layered(config_dir)?;
    let http = Arc::new(ReqwestClient::new());

    if cli.update_config {
        config = with_latest_config(config, http.as_ref(), LATEST_CONFIG_URL).await?;
        config::save(&user_path, &config)?;
    }

    if cli.pkg_names.is_empty() {
        return Ok(());
    }

    let working_dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let pipeline = Pipeline::new(
        http,
        Arc::new(CommandCloner::new()),
        Arc::new(PipInstaller::from_env()),
    );
    let founds = pipeline
        .resolve_and_install(&cli.pkg_names, &working_dir, &config)
        .await?;

    if founds.is_empty() {
        return Ok(());
    }

    for (pkg_name, repo_url) in &founds {
        println!("{pkg_name} -> {repo_url}");
        config.record_repo_url(pkg_name, repo_url);
    }
    config::save(&user_path, &config)?;

    Ok(())
}
