//! B3 - The Bureaucratic Barriers Buster
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::sync::Arc;

use b3::core::config::AgentConfig;
use b3::store::{DocumentStore, Folder, LocalStore};
use b3::{Config, DispatchMode, GeminiClient, Repl};
use clap::{ArgAction, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// B3 - a chat-first intelligent agent for your documents
#[derive(Parser, Debug)]
#[command(name = "b3")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print logs (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// List the files of the archive folder as JSON and exit
    #[arg(long)]
    list: bool,

    /// Write the default configuration file and exit
    #[arg(long)]
    init_config: bool,

    /// Model of the B3 assistant
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Model of the experts and document analysis
    #[arg(long)]
    expert_model: Option<String>,

    /// Which call requests of a turn are resolved: first or all
    #[arg(long)]
    dispatch: Option<String>,

    /// Maximum capability calls per question (0 = unlimited)
    #[arg(long)]
    max_calls: Option<usize>,

    /// Directory holding the document folders
    #[arg(long)]
    root: Option<PathBuf>,

    /// Questions answered before the interactive session starts
    questions: Vec<String>,
}

/// Log verbosity from `-v` flags, raised to debug by `B3_DEBUG`
fn startup_verbosity(flags: u8, env_debug: bool) -> u8 {
    if env_debug {
        flags.max(2)
    } else {
        flags
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "b3=info,warn",
        2 => "b3=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();

    // Logging first, so config loading can report problems
    let verbosity = startup_verbosity(args.verbose, AgentConfig::default().debug);
    init_logging(verbosity);

    // Build configuration
    let mut config = Config::load();
    if config.agent.debug && verbosity < 2 {
        tracing::warn!("debug is set in the config file; use -vv or B3_DEBUG=1 for debug logs");
    }

    // Apply CLI overrides
    if let Some(model) = args.model {
        config.models.primary = model;
    }
    if let Some(model) = args.expert_model {
        config.models.expert = model;
    }
    if let Some(ref dispatch) = args.dispatch {
        config.agent.dispatch = dispatch.parse::<DispatchMode>()?;
    }
    if let Some(max_calls) = args.max_calls {
        config.agent.max_calls = max_calls;
    }
    if let Some(root) = args.root {
        config.store.root = root;
    }

    if args.init_config {
        let path = config.save()?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let store = Arc::new(LocalStore::from_config(&config.store));

    if args.list {
        let files = store.list(Folder::Archive).await?;
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    let client = Arc::new(GeminiClient::from_config(&config)?);

    // Interactive REPL mode
    let mut repl = Repl::new(config, client, store)?;
    repl.run(args.questions).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_verbosity() {
        assert_eq!(startup_verbosity(0, false), 0);
        assert_eq!(startup_verbosity(0, true), 2);
        assert_eq!(startup_verbosity(3, true), 3);
        assert_eq!(startup_verbosity(1, false), 1);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["b3", "-vv", "--dispatch", "all", "list my files"]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.dispatch.as_deref(), Some("all"));
        assert_eq!(args.questions, vec!["list my files"]);
    }
}
