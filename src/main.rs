use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use vaultguard::{AwsOrchestrator, Config, DebugFlags, LogWriter, Subscribe, SupervisorBuilder};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Discovers vault servers on ECS and keeps them initialized and unsealed.
#[derive(Debug, Parser)]
#[command(name = "vaultguard", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Config file (default: /etc/vaultguard/config.yaml, then $HOME/vaultguard/config.yaml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    debug: bool,

    /// Dump the decoded configuration and per-stage discovery records
    #[arg(long = "debugconfig")]
    debug_config: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the version
    Version {
        /// Also print the build context
        #[arg(short, long = "buildcontext")]
        build_context: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(Command::Version { build_context }) = cli.command {
        print_version(build_context);
        return ExitCode::SUCCESS;
    }

    let flags = DebugFlags {
        debug: cli.run.debug,
        debug_config: cli.run.debug_config,
    };
    if let Err(e) = vaultguard::logging::init(flags) {
        eprintln!("vaultguard: unable to initialise logging: {e}");
    }

    match run(cli.run.config, flags).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("vaultguard stopped with an error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Option<PathBuf>, flags: DebugFlags) -> anyhow::Result<()> {
    let config = Config::locate_and_load(config.as_deref()).context("loading configuration")?;
    if flags.debug_config {
        info!(?config, "loaded configuration");
    }

    let api = Arc::new(AwsOrchestrator::from_env().await);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = SupervisorBuilder::new(config, api)
        .with_subscribers(subs)
        .with_flags(flags)
        .build();

    let reason = sup.run().await.context("draining workers")?;
    info!(%reason, "vaultguard stopped");
    Ok(())
}

fn print_version(build_context: bool) {
    println!("vaultguard version v{VERSION}");
    if build_context {
        println!("  package:    {} {}", env!("CARGO_PKG_NAME"), VERSION);
        println!("  target:     {}-{}", std::env::consts::ARCH, std::env::consts::OS);
        println!(
            "  git commit: {}",
            option_env!("VAULTGUARD_GIT_COMMIT").unwrap_or("unknown")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::parse_from(["vaultguard", "--config", "/tmp/c.yaml", "-d", "--debugconfig"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.run.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert!(cli.run.debug);
        assert!(cli.run.debug_config);
    }

    #[test]
    fn version_subcommand_parses() {
        let cli = Cli::parse_from(["vaultguard", "version", "-b"]);
        assert!(matches!(
            cli.command,
            Some(Command::Version {
                build_context: true
            })
        ));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
