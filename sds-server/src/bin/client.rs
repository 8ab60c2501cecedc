use clap::Parser;
use sds_server::cli::ClientArgs;
use sds_server::{client, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = ClientArgs::parse();
    telemetry::init(args.log_format);

    client::run(args).await
}
