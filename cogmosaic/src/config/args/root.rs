use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;

use crate::config::args::SrvArgs;
use crate::config::env::Env;
use crate::config::file::Config;
use crate::config::file::cors::CorsConfig;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

/// Parse a human-readable duration string (e.g., "1h", "30m", "1d")
fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug, PartialEq, Default)]
#[command(
    about,
    version,
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=cogmosaic=debug. Use COGMOSAIC_FORMAT to pick the log format: json, full, compact, bare or pretty.",
    styles = HELP_STYLES
)]
pub struct Args {
    #[command(flatten)]
    pub meta: MetaArgs,
    #[command(flatten)]
    pub storage: StorageArgs,
    #[command(flatten)]
    pub srv: SrvArgs,
}

// None of these params will be transferred to the config
#[derive(Parser, Debug, Clone, PartialEq, Default)]
#[command(about, version)]
pub struct MetaArgs {
    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Save resulting config to a file or use "-" to print to stdout.
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone, PartialEq, Default)]
#[command()]
pub struct StorageArgs {
    /// Where created mosaics are stored, e.g. `s3://bucket` or a local directory.
    /// Falls back to MOSAIC_STORE_URL, then to `s3://$MOSAIC_DEF_BUCKET`.
    #[arg(long)]
    pub store_url: Option<String>,
    /// Path of the mosaics inside of the storage. Falls back to MOSAIC_PREFIX. [DEFAULT: mosaics]
    #[arg(long)]
    pub prefix: Option<String>,
    /// Asset cache size (in MB)
    #[arg(short = 'C', long)]
    pub asset_cache_size: Option<u64>,
    /// Maximum lifetime of cached assets.
    ///
    /// Supports human-readable formats like "1h", "30m", "1d", or "3600s".
    #[arg(long, value_parser = parse_duration)]
    pub asset_cache_expiry: Option<Duration>,
}

impl Args {
    /// Apply command line values, then fill what is still missing from the environment.
    pub fn merge_into_config<'a>(self, config: &mut Config, env: &impl Env<'a>) {
        self.srv.merge_into_config(&mut config.srv);

        if self.storage.store_url.is_some() {
            config.storage.url = self.storage.store_url;
        }
        if self.storage.prefix.is_some() {
            config.storage.prefix = self.storage.prefix;
        }
        if self.storage.asset_cache_size.is_some() {
            config.asset_cache_size_mb = self.storage.asset_cache_size;
        }
        if self.storage.asset_cache_expiry.is_some() {
            config.asset_cache_expiry = self.storage.asset_cache_expiry;
        }

        config.storage.apply_env(env);
        if config.srv.cache_control.is_none() {
            config.srv.cache_control = env.get_env_str("CACHE_CONTROL");
        }
        if config.srv.cors.is_none() && env.get_env_str("CORS").is_some() {
            config.srv.cors = Some(CorsConfig::SimpleFlag(true));
        }
    }
}
