use std::env;

use clap::Parser;
use cogmosaic::CogMosaicResult;
use cogmosaic::config::args::Args;
use cogmosaic::config::env::OsEnv;
use cogmosaic::config::file::{Config, read_config};
use cogmosaic::logging::{ensure_core_log_level_matches, init_tracing};
use cogmosaic::srv::new_server;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

async fn start(args: Args) -> CogMosaicResult<()> {
    info!("Starting cogmosaic v{VERSION}");

    let env = OsEnv::default();
    let save_config = args.meta.save_config.clone();
    let mut config = if let Some(ref cfg_filename) = args.meta.config {
        info!("Using {}", cfg_filename.display());
        read_config(cfg_filename, &env)?
    } else {
        info!("Config file is not specified, using command line and environment");
        Config::default()
    };

    args.merge_into_config(&mut config, &env);
    config.finalize()?;
    let service = config.resolve()?;

    if let Some(file_name) = save_config {
        config.save_to_file(file_name.as_path())?;
    } else {
        info!("Use --save-config to save or print the configuration.");
    }

    let (server, listen_addresses) = new_server(config.srv, service)?;
    info!("cogmosaic has been started on {listen_addresses}.");
    info!("POST a JSON list of assets to http://{listen_addresses}/create to create a mosaic.");

    server.await
}

#[tokio::main]
async fn main() {
    let filter = ensure_core_log_level_matches(env::var("RUST_LOG").ok(), "cogmosaic=");
    init_tracing(&filter, env::var("COGMOSAIC_FORMAT").ok());

    let args = Args::parse();
    if let Err(e) = start(args).await {
        // Ensure the message is printed, even if the logging is disabled
        if tracing::enabled!(tracing::Level::ERROR) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
}
