mod server;
mod watch;

use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use sugarweave_compiler::logging::init_tracing;
use sugarweave_compiler::Config;

#[derive(Parser, Debug)]
#[command(name = "sugarweave-dev")]
#[command(about = "Preview server and rebuild-on-change watcher for sugarweave projects")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to ./sugarweave.json when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the configured server port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the compiled story and static assets with caching disabled
    Serve,
    /// Recompile in dev mode whenever a source file changes
    Watch,
    /// Compile once, then serve and watch together
    Dev,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    match args.command {
        Command::Serve => server::serve(&config),
        Command::Watch => watch::watch(&config),
        Command::Dev => {
            watch::rebuild(&config);
            let server_config = config.clone();
            let server = thread::spawn(move || server::serve(&server_config));
            watch::watch(&config)?;
            server
                .join()
                .map_err(|_| anyhow!("server thread panicked"))?
        }
    }
}
