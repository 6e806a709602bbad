mod background_service;
mod config;
mod infrastructure;
mod server;

use colored::Colorize;

#[tokio::main]
async fn main() {
    let config = match config::build_config() {
        Ok(x) => x,
        Err(e) => {
            eprintln!("{}: {e}", "Failed to build config".red());
            return;
        }
    };

    if let Err(e) = config::initialize_telemetry() {
        eprintln!("{}: {e}", "Failed to initialize logger".red());
        return;
    }

    server::run(config).await;
}
