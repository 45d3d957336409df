mod args;
mod live;

use clap::Parser;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::live::config_reader::{read_config, LiveConfig};
use crate::live::service::ServiceSettings;
use crate::live::LiveResult;

async fn run(args: &Args) -> LiveResult<()> {
    if args.input.is_some() {
        return live::run_tabulation(args);
    }
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => LiveConfig::default(),
    };
    let settings = ServiceSettings::from_config(&config)?;
    live::io_jsonl::serve(settings).await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    info!("args: {:?}", args);

    if let Err(e) = run(&args).await {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("{}", bt);
        }
        std::process::exit(1);
    }
}
