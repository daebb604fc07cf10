mod harvest;
mod interrupt;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{error::ErrorKind, Parser};
use git_transport::RemoteUrl;

#[derive(Parser, Debug)]
#[command(
    name = "githarvest",
    about = "Rebuild a working tree from a .git directory exposed over HTTP",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Base URL of the exposed .git directory, e.g. http://example.com/.git/
    #[arg(value_parser = parse_url)]
    url: RemoteUrl,

    /// Connect to this port instead of the URL's
    #[arg(short, long)]
    port: Option<u16>,

    /// Output directory [default: the target host name]
    #[arg(short, long, value_name = "dir")]
    output: Option<PathBuf>,

    /// Number of objects fetched in parallel
    #[arg(short, long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..=1024))]
    jobs: u32,

    /// Attempts per object before giving up on a transient failure
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=100))]
    retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "secs", default_value_t = 30)]
    timeout: u64,

    /// User-Agent header sent with every request
    #[arg(long, value_name = "agent")]
    user_agent: Option<String>,

    /// Remove the output directory first if it already exists
    #[arg(long)]
    clean: bool,

    /// Log each fetch (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_url(input: &str) -> Result<RemoteUrl, String> {
    RemoteUrl::parse(input).map_err(|e| e.to_string())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => process::exit(0),
                _ => process::exit(2),
            }
        }
    };

    logging::init(cli.verbose);

    match harvest::run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("fatal: {e:#}");
            process::exit(128);
        }
    }
}
