use clap::Subcommand;

use crate::database::manager::DatabaseManager;
use crate::services::invites;

#[derive(Subcommand)]
pub enum InviteCommands {
    #[command(about = "Mark pending invites past their expiry as expired")]
    Prune,
}

pub async fn run(cmd: InviteCommands) -> anyhow::Result<()> {
    match cmd {
        InviteCommands::Prune => {
            let pool = DatabaseManager::pool().await?;
            let pruned = invites::prune_expired(&pool).await?;
            println!("Expired {pruned} invite(s)");
        }
    }
    Ok(())
}
