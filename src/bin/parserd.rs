//! parserd - message-queue parser worker
//!
//! Consumes parse jobs from the service queue, dispatches them to the
//! compiled-in plugin set named in the service config, and publishes each
//! job's reply.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use parserd::nats::{BrokerConfig, NatsClient};
use parserd::plugins;
use parserd::{ServiceConfig, Worker};

#[derive(Parser)]
#[command(name = "parserd")]
#[command(version, about = "Message-queue parser worker", long_about = None)]
struct Cli {
    /// Path to the service config YAML
    #[arg(short, long, default_value = "parserd.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match ServiceConfig::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut registry = plugins::builtin_registry();
    let plugin_set = match registry.take(&config.name) {
        Some(set) => set,
        None => {
            eprintln!(
                "Error: no plugin set registered for service '{}' (registered: {})",
                config.name,
                registry.service_names().join(", ")
            );
            process::exit(1);
        }
    };

    let descriptor = config.descriptor(plugin_set.sub_parser_names());
    tracing::info!(
        "Service '{}' ({}), sub-parsers: {}",
        descriptor.name,
        descriptor.display_name,
        descriptor.sub_parsers.join(", ")
    );

    let client = NatsClient::connect(&BrokerConfig::default())
        .await
        .expect("Failed to connect to NATS");

    let worker = Worker::new(client, descriptor, plugin_set);
    if let Err(e) = worker.run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
