//! `istari keys` subcommands.

use {
    clap::Subcommand,
    istari_gateway::{ApiKeyStore, state::open_database},
};

#[derive(Subcommand)]
pub enum KeyAction {
    /// Mint a new API key for a caller. The raw key is printed once.
    Create {
        /// Caller identity the key authenticates as.
        #[arg(long)]
        caller: String,
        /// Human-readable label (e.g. "laptop", "ci").
        #[arg(long, default_value = "default")]
        label: String,
    },
    /// List active keys.
    List,
    /// Revoke a key by id.
    Revoke {
        /// Key id as shown by `keys list`.
        id: i64,
    },
}

pub async fn handle_keys(action: KeyAction, db_path: &str) -> anyhow::Result<()> {
    let pool = open_database(db_path).await?;
    let store = ApiKeyStore::new(pool);

    match action {
        KeyAction::Create { caller, label } => {
            let (id, raw_key) = store.create(&caller, &label).await?;
            println!("Created key #{id} for caller '{caller}'.");
            println!("{raw_key}");
            println!("Store it now; it cannot be shown again.");
        },
        KeyAction::List => {
            let keys = store.list().await?;
            if keys.is_empty() {
                println!("No active keys.");
            } else {
                for key in &keys {
                    println!(
                        "  #{} {}… caller={} label={} created={}",
                        key.id, key.key_prefix, key.caller_id, key.label, key.created_at
                    );
                }
            }
        },
        KeyAction::Revoke { id } => {
            store.revoke(id).await?;
            println!("Revoked key #{id}.");
        },
    }

    Ok(())
}
