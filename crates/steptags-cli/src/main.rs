//! StepTags CLI Application
//!
//! Command-line interface and MCP server for the StepTags project tracker.

mod args;
mod cli;
mod edits;
mod mcp;
mod renderer;

use std::sync::Arc;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use log::info;
use mcp::{run_stdio_server, StepTagsMcpServer};
use renderer::TerminalRenderer;
use steptags_core::TrackerBuilder;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        user,
        invite_base_url,
        no_color,
        command,
    } = Args::parse();

    let mut builder = TrackerBuilder::new()
        .with_database_path(database_file)
        .with_user(user);
    if let Some(url) = invite_base_url {
        builder = builder.with_invite_base_url(url);
    }
    let tracker = Arc::new(
        builder
            .build()
            .await
            .context("Failed to initialize tracker")?,
    );

    info!("StepTags started");

    let cli = Cli::new(Arc::clone(&tracker), TerminalRenderer::new(!no_color));
    match command {
        Some(Project { command }) => cli.handle_project_command(command).await,
        Some(Step { command }) => cli.handle_step_command(command).await,
        Some(Tree(args)) => cli.show_tree(args).await,
        Some(Board(args)) => cli.show_board(args).await,
        Some(Member { command }) => cli.handle_member_command(command).await,
        Some(Invite { command }) => cli.handle_invite_command(command).await,
        Some(Activity(args)) => cli.show_activity(args).await,
        Some(Serve) => {
            info!("Starting StepTags MCP server");
            run_stdio_server(StepTagsMcpServer::new(tracker))
                .await
                .context("MCP server failed")
        }
        None => cli.list_projects().await,
    }
}
