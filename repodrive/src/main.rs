use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use repodrive::config::AppConfig;
use repodrive::shell::{Shell, render_entries, render_tree};
use repodrive::storage::SnapshotStore;
use repodrive::sync::clipboard::TransferMode;
use repodrive::sync::engine::SyncEngine;
use repodrive::sync::paths::Location;
use repodrive::sync::tree::TreeCache;
use repodrive_core::{RemoteStore, RepoClient};
use tokio::io::BufReader;
use tracing::warn;

/// Browse and edit a GitHub repository as if it were a drive.
#[derive(Debug, Parser)]
#[command(name = "repodrive", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Refresh and list a folder (`/` or empty is the root)
    Ls {
        #[arg(default_value = "")]
        dir: String,
    },
    /// Print the locally cached tree without contacting the remote
    Tree,
    /// Upload a local file
    Upload {
        file: PathBuf,
        #[arg(long, default_value = "")]
        to: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Create a folder
    Mkdir { dir: String, name: String },
    /// Rename a file or folder in place
    Rename { dir: String, old: String, new: String },
    /// Delete a file or folder
    Rm { dir: String, name: String },
    /// Move a file or folder to another folder
    Mv {
        src_dir: String,
        name: String,
        dst_dir: String,
    },
    /// Copy a file or folder to another folder
    Cp {
        src_dir: String,
        name: String,
        dst_dir: String,
    },
    /// Print a file
    Cat { dir: String, name: String },
    /// Show the account the token belongs to
    Whoami,
    /// Interactive session with a clipboard
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    repodrive::logging::init()?;
    let config = AppConfig::from_env()?;
    let client = build_client(&config)?;

    let snapshots = SnapshotStore::new(&config.state_dir, &config.repo);
    let tree = match snapshots.load().await {
        Ok(tree) => tree,
        Err(err) => {
            warn!(path = %snapshots.path().display(), error = %err, "starting from an empty tree");
            TreeCache::default()
        }
    };
    let engine = SyncEngine::new(client, tree)
        .with_snapshots(snapshots)
        .with_options(config.engine);
    run(cli.command, engine).await
}

fn build_client(config: &AppConfig) -> anyhow::Result<RepoClient> {
    let client = match &config.api_url {
        Some(url) => RepoClient::with_base_url(url, config.repo.clone(), config.token.clone())
            .context("invalid REPODRIVE_API_URL")?,
        None => RepoClient::new(config.repo.clone(), config.token.clone())
            .context("failed to build http client")?,
    };
    let client = client.with_retry(config.retry);
    Ok(match &config.branch {
        Some(branch) => client.with_branch(branch.clone()),
        None => client,
    })
}

fn location(dir: &str) -> anyhow::Result<Location> {
    Location::from_remote_path(dir).with_context(|| format!("invalid folder `{dir}`"))
}

async fn run(command: Command, mut engine: SyncEngine<RepoClient>) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    match command {
        Command::Ls { dir } => {
            let dir = location(&dir)?;
            let entries = engine
                .list_directory(&dir)
                .await
                .with_context(|| format!("ls {dir}"))?;
            stdout.write_all(render_entries(&entries).as_bytes())?;
        }
        Command::Tree => stdout.write_all(render_tree(engine.tree()).as_bytes())?,
        Command::Upload { file, to, name } => {
            let dir = location(&to)?;
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("cannot derive a name from {}", file.display()))?,
            };
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            engine.list_directory(&dir).await.with_context(|| format!("ls {dir}"))?;
            let reference = engine
                .upload(&dir, &name, &bytes)
                .await
                .with_context(|| format!("upload {name}"))?;
            match reference.html_url {
                Some(link) => writeln!(stdout, "uploaded {} {link}", reference.path)?,
                None => writeln!(stdout, "uploaded {}", reference.path)?,
            }
        }
        Command::Mkdir { dir, name } => {
            let dir = location(&dir)?;
            engine.list_directory(&dir).await.with_context(|| format!("ls {dir}"))?;
            engine
                .create_folder(&dir, &name)
                .await
                .with_context(|| format!("mkdir {name}"))?;
        }
        Command::Rename { dir, old, new } => {
            let dir = location(&dir)?;
            engine.list_directory(&dir).await.with_context(|| format!("ls {dir}"))?;
            engine
                .rename(&dir, &old, &new)
                .await
                .with_context(|| format!("rename {old} to {new}"))?;
        }
        Command::Rm { dir, name } => {
            let dir = location(&dir)?;
            engine.list_directory(&dir).await.with_context(|| format!("ls {dir}"))?;
            engine
                .delete(&dir, &name)
                .await
                .with_context(|| format!("rm {name}"))?;
        }
        Command::Mv { src_dir, name, dst_dir } => {
            transfer(&mut engine, &src_dir, &name, &dst_dir, TransferMode::Move).await?;
        }
        Command::Cp { src_dir, name, dst_dir } => {
            transfer(&mut engine, &src_dir, &name, &dst_dir, TransferMode::Copy).await?;
        }
        Command::Cat { dir, name } => {
            let dir = location(&dir)?;
            engine.list_directory(&dir).await.with_context(|| format!("ls {dir}"))?;
            let bytes = engine
                .fetch(&dir, &name)
                .await
                .with_context(|| format!("cat {name}"))?;
            stdout.write_all(&bytes)?;
        }
        Command::Shell => {
            let mut shell = Shell::new(engine);
            let input = BufReader::new(tokio::io::stdin());
            shell.run(input, &mut stdout).await?;
        }
        Command::Whoami => {
            let client = engine.store();
            let login = client.authenticated_user().await.context("whoami")?;
            writeln!(stdout, "{login} @ {}", client.repo())?;
        }
    }
    Ok(())
}

async fn transfer<S: RemoteStore>(
    engine: &mut SyncEngine<S>,
    src_dir: &str,
    name: &str,
    dst_dir: &str,
    mode: TransferMode,
) -> anyhow::Result<()> {
    let source = location(src_dir)?;
    let target = location(dst_dir)?;
    // Source last, so its cached entries are the freshest.
    for dir in [&target, &source] {
        engine
            .list_directory(dir)
            .await
            .with_context(|| format!("ls {dir}"))?;
    }
    engine
        .transfer(&source, name, &target, mode)
        .await
        .with_context(|| format!("{mode} {name} to {target}"))
}
