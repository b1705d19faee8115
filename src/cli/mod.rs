pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "Nexus CLI - administration for the Nexus API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve,

    #[command(about = "Database management")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },

    #[command(about = "Invite maintenance")]
    Invite {
        #[command(subcommand)]
        cmd: commands::invite::InviteCommands,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve => crate::server::serve().await,
        Commands::Db { cmd } => commands::db::run(cmd).await,
        Commands::Invite { cmd } => commands::invite::run(cmd).await,
    }
}
