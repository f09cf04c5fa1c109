use anyhow::Result;
use clap::Parser;
use img2svg::commands::{
    self, ConvertOptions,
    config::{Config, DEFAULT_API_URL, Settings},
};
use img2svg::http::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// img2svg - raster image to SVG converter
///
/// Sends images to the conversion API and writes back the SVG.
///
/// If IMG2SVG_TOKEN is set, it is sent as a bearer token.
///
/// Examples:
///   img2svg convert logo.png -o logo.svg
#[derive(Parser, Debug)]
#[command(author, version = env!("IMG2SVG_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Conversion API base URL
    #[arg(
        long = "api-url",
        env = "IMG2SVG_API_URL",
        value_name = "URL",
        default_value = DEFAULT_API_URL,
        global = true
    )]
    pub api_url: String,

    /// Bearer token for the API
    #[arg(long, env = "IMG2SVG_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Retries for timeouts, rate limits and server errors
    #[arg(long, value_name = "N", default_value_t = 3, global = true)]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    #[arg(long, value_name = "MS", default_value_t = 1000, global = true)]
    pub base_delay_ms: u64,

    /// Make a single attempt only
    #[arg(long, global = true)]
    pub no_retry: bool,

    /// Per-request timeout
    #[arg(long, value_name = "SECS", default_value_t = 60, global = true)]
    pub timeout_secs: u64,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
            retry: (!self.no_retry).then(|| RetryPolicy::new(self.max_retries, self.base_delay_ms)),
            request_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Convert a raster image to SVG
    Convert(ConvertArgs),

    /// Print the cache keys used for conversion results
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Image to convert
    #[arg(value_name = "IMAGE")]
    pub input: PathBuf,

    /// Write the SVG to this file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Tracing quality, 1 (coarse) to 10 (fine)
    #[arg(long, short = 'q', value_parser = clap::value_parser!(u8).range(1..=10))]
    pub quality: Option<u8>,

    /// Drop the image background
    #[arg(long)]
    pub transparent_bg: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Convert(args) => {
            let config = Config::new(&cli.settings())?;
            let options = ConvertOptions {
                input: args.input.clone(),
                output: args.output.clone(),
                quality: args.quality,
                transparent_bg: args.transparent_bg,
            };
            let mut stdout = std::io::stdout().lock();
            commands::convert(&config.client, &options, &mut stdout).await?
        }
        Commands::Keys => commands::keys(&mut std::io::stdout().lock())?,
    }
    Ok(())
}
