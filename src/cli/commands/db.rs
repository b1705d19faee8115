use clap::Subcommand;

use crate::database::manager::DatabaseManager;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Apply schema migrations")]
    Init,

    #[command(about = "Check database connectivity")]
    Ping,
}

pub async fn run(cmd: DbCommands) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Init => {
            DatabaseManager::migrate().await?;
            println!("Migrations applied");
        }
        DbCommands::Ping => {
            DatabaseManager::health_check().await?;
            println!("Database reachable");
        }
    }
    Ok(())
}
