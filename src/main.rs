mod activity_log;
mod app;
mod cli;
mod config;
mod error;
mod launcher;
mod library;
mod migrations;
mod query;
mod session;
mod store;
mod ui;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
