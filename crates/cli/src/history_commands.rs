use {anyhow::Result, clap::Subcommand, claimguard_config::ClaimguardConfig};

use claimguard_sessions::ConversationStore;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Print the stored turns for a user, oldest first.
    Show { user: String },
    /// Delete a user's history.
    Clear { user: String },
}

pub async fn handle_history(action: HistoryAction, config: &ClaimguardConfig) -> Result<()> {
    let store =
        ConversationStore::open(&config.storage.database_url, config.chat.history_limit).await?;
    run(&store, action).await
}

async fn run(store: &ConversationStore, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::Show { user } => {
            let history = store.load(&user).await?;
            if history.is_empty() {
                println!("No history for {user}.");
            }
            for turn in history.turns() {
                println!("{turn}");
            }
        },
        HistoryAction::Clear { user } => {
            if store.clear(&user).await? {
                println!("Cleared history for {user}.");
            } else {
                println!("No history for {user}.");
            }
        },
    }
    Ok(())
}
