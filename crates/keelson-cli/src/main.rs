//! Keelson CLI - Validate and render Mermaid state diagrams

mod cli;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();
    let app = cli::KeelsonApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
