use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assetforge::{AssetforgeError, Paths, TaskId};

#[derive(Parser)]
#[command(name = "assetforge", version, about)]
struct Cli {
    /// Source directory
    #[arg(long, default_value = "src")]
    src: Utf8PathBuf,

    /// Build output directory
    #[arg(long, default_value = "dist")]
    dist: Utf8PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Copy markup once
    Html,
    /// Compile stylesheets once
    Css,
    /// Assemble and minify scripts once
    Js,
    /// Optimize images once
    Images,
    /// Derive webp copies once
    #[command(alias = "webpImages")]
    WebpImages,
    /// Copy fonts once
    Fonts,
    /// Copy video once
    Video,
    /// Remove the build root
    Clean,
    /// Clean, then run every task in parallel
    Build,
    /// Build, then rebuild on change with live reload (default)
    Watch,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AssetforgeError> {
    let paths = Paths::new(&cli.src, &cli.dist)?;

    let task = |id: TaskId| -> Result<(), AssetforgeError> {
        assetforge::run_task(id, &paths).map_err(|e| AssetforgeError::Task(id.name(), e))?;
        Ok(())
    };

    match cli.command.unwrap_or(Command::Watch) {
        Command::Html => task(TaskId::Markup),
        Command::Css => task(TaskId::Styles),
        Command::Js => task(TaskId::Scripts),
        Command::Images => task(TaskId::Images),
        Command::WebpImages => task(TaskId::WebpImages),
        Command::Fonts => task(TaskId::Fonts),
        Command::Video => task(TaskId::Video),
        Command::Clean => Ok(assetforge::clean(&paths)?),
        Command::Build => {
            assetforge::build(&paths)?;
            Ok(())
        }
        Command::Watch => Ok(assetforge::watch(&paths)?),
    }
}
