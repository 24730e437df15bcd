use clap::{Parser, Subcommand};
use std::path::PathBuf;

use screen_recordings::config::ServerConfig;
use screen_recordings::serve::serve_recordings;

#[derive(Parser, Debug)]
#[command(author, version, about = "Store, list, rename and delete uploaded screen recordings")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the recordings API and uploaded content via HTTP
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides config file and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn load_config(
    path: Option<PathBuf>,
    port: Option<u16>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => ServerConfig::from_file(&path)?,
        None => ServerConfig::default(),
    };
    config.apply_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    Ok(config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let result = match args.command {
        Command::Serve { config, port } => {
            load_config(config, port).and_then(serve_recordings)
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
