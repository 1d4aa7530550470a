use anyhow::Result;
use clap::Parser;
use startup_validator::cli::{Args, init_tracing};
use startup_validator::launch;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mode = args.launch_mode();
    let check_connection = !args.skip_connection_check;
    let log_format = args.log_format;

    let config = args.into_config()?;
    init_tracing(log_format, config.verbose);

    launch(&config, mode, check_connection).await
}
