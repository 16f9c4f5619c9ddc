// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use calendar::commands::{self, Cli};
use calendar::config::Config;
use clap::Parser;

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().with_data_dir(cli.data_dir);
    tracing::debug!("Using storage file {}", config.store_path().display());

    let output = match commands::run(cli.command, &config) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            tracing::error!("Failed to print the command output: {}", e);
            std::process::exit(1);
        }
    }
}
