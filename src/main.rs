mod cli;
mod commands;
mod common;
mod config;
mod deck;
mod narration;
mod pipeline;
mod speech;
mod ui;
mod video;

use clap::Parser;

use crate::cli::Cli;
use crate::ui::prelude::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.output_format, !cli.no_color);
    ui::set_debug_mode(cli.debug);
    if cli.debug {
        emit(Level::Debug, "slidecast.debug", "Debug mode is on", None);
    }

    if let Err(err) = commands::dispatch(cli).await {
        emit(Level::Error, "slidecast.error", &format!("Error: {err:#}"), None);
        std::process::exit(1);
    }
}
