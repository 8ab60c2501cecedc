use clap::Parser;
use sds_server::cli::ServerArgs;
use sds_server::{server, signal, telemetry};
use xds_sds::Lifecycle;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = ServerArgs::parse();
    telemetry::init(args.log_format);

    let lifecycle = Lifecycle::new();
    signal::stop_on_signal(lifecycle.clone());

    server::run(args, lifecycle).await
}
