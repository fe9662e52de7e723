mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use routerlink_api::DeviceClient;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a device
        Command::Config(ref args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(ref args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "routerlink", &mut std::io::stdout());
            Ok(())
        }

        // The stream needs a gateway URL, not device credentials
        Command::Watch(args) => {
            let cfg = config::load_config()?;
            let resolved = match config::resolve(&cli.global, &cfg) {
                Ok(resolved) => resolved,
                Err(CliError::NoConfig { .. }) if args.url.is_some() => config::Resolved::adhoc(),
                Err(e) => return Err(e),
            };
            let stream = config::stream_config(&resolved, args.url.as_deref())?;
            commands::watch::handle(args, stream, &cli.global).await
        }

        cmd => {
            let cfg = config::load_config()?;
            let resolved = config::resolve(&cli.global, &cfg)?;
            let client = DeviceClient::new(config::client_config(&resolved, &cli.global, &cfg)?)?;

            tracing::debug!(command = ?cmd, profile = %resolved.name, "dispatching command");
            let result = commands::dispatch(cmd, &client, &cli.global).await;
            client.close();
            result
        }
    }
}
