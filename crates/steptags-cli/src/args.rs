use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{
    ActivityArgs, BoardArgs, InviteCommands, MemberCommands, ProjectCommands, StepCommands,
    TreeArgs,
};

/// Command-line interface for StepTags
///
/// StepTags tracks projects as a forest of nested steps. The same steps can
/// be viewed as an indented tree or as a status board of the top-level
/// steps, shared with other members of the project. The binary also runs as
/// an MCP (Model Context Protocol) server over stdio.
#[derive(Parser)]
#[command(version, about, name = "st")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/steptags/steptags.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// User to act as
    #[arg(long, short, global = true, env = "STEPTAGS_USER")]
    pub user: Option<String>,

    /// Base URL used in invitation links
    #[arg(long, global = true, env = "STEPTAGS_INVITE_URL")]
    pub invite_base_url: Option<String>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
///
/// Without a command, `st` lists the projects of the acting user.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects
    #[command(alias = "p")]
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage steps within projects
    #[command(alias = "s")]
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },
    /// Show a project's steps as an indented tree
    #[command(alias = "t")]
    Tree(TreeArgs),
    /// Show a project's top-level steps grouped by status
    #[command(alias = "b")]
    Board(BoardArgs),
    /// Manage project members
    #[command(alias = "m")]
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Accept, revoke and list invitations
    #[command(alias = "i")]
    Invite {
        #[command(subcommand)]
        command: InviteCommands,
    },
    /// Show recent changes in a project
    #[command(alias = "a")]
    Activity(ActivityArgs),
    /// Start the MCP server
    Serve,
}
