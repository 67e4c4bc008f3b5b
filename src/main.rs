use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ufw_docker_sync::docker::DockerConnector;
use ufw_docker_sync::manager::cleanup::clear_managed_rules;
use ufw_docker_sync::ufw::UfwClient;
use ufw_docker_sync::{RuleManager, VERSION, parse_duration, shutdown_signal};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Keep ufw rules in sync with labeled Docker containers",
    long_about = None
)]
struct Args {
    /// Remove all rules created by ufw-docker-sync and exit
    #[arg(long)]
    clear: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to log to (use "stdout" or "stderr" for console output)
    #[arg(short = 'l', long, default_value = "stdout")]
    log_path: String,

    /// Timeout for Docker API requests
    #[arg(short = 't', long, default_value = "10s", value_parser = parse_duration)]
    timeout: Duration,

    /// Delay between Docker reconnection attempts
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    retry_delay: Duration,

    /// Interval between orphaned rule cleanups
    #[arg(long, default_value = "60s", value_parser = parse_duration)]
    cleanup_interval: Duration,

    /// Path to the ufw binary
    #[arg(long, default_value = "ufw")]
    ufw_path: String,

    /// Print version and build information and exit
    #[arg(long = "version-info")]
    version_info: bool,
}

#[tokio::main]
async fn main() {
    // Load .env file if it exists
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Error loading .env file: {}", e);
        }
    }

    let args = Args::parse();

    if args.version_info {
        println!("ufw-docker-sync {}", VERSION);
        return;
    }

    let env_filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);

    // Held until exit so buffered log lines are flushed
    let _guard = match args.log_path.as_str() {
        "stdout" => {
            let subscriber = subscriber.with(fmt::layer());
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
            None
        }
        "stderr" => {
            let subscriber = subscriber.with(fmt::layer().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
            None
        }
        path => {
            let file_appender = tracing_appender::rolling::never("", path);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let subscriber =
                subscriber.with(fmt::layer().with_ansi(false).with_writer(non_blocking));
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
            Some(guard)
        }
    };

    let firewall = Arc::new(UfwClient::builder().program(args.ufw_path).build());

    if args.clear {
        info!("Clearing all managed ufw rules");
        if let Err(e) = clear_managed_rules(firewall.as_ref()).await {
            error!("Failed to clear rules: {}", e);
            std::process::exit(1);
        }
        return;
    }

    info!("Starting ufw-docker-sync v{}", VERSION);

    let connector = Arc::new(DockerConnector::builder().timeout(args.timeout).build());
    let rule_manager = RuleManager::builder()
        .connector(connector)
        .firewall(firewall)
        .retry_delay(args.retry_delay)
        .cleanup_interval(args.cleanup_interval)
        .build()
        .start();

    shutdown_signal().await;
    info!("Shutting down");

    rule_manager.stop().await;
}
