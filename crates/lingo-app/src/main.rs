use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use lingo_relay::{ReconnectPolicy, RelayClient};
use lingo_store::SqliteStore;
use lingo_sync::{SyncCommand, SyncConfig, SyncNotice, Synchronizer};
use lingo_types::{Identity, UserId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingo=debug".into()),
        )
        .init();

    // Config
    let relay_url =
        std::env::var("LINGO_RELAY_URL").unwrap_or_else(|_| "ws://localhost:5000".into());
    let db_path = std::env::var("LINGO_DB_PATH").unwrap_or_else(|_| "lingo.db".into());
    let tail_limit: usize = std::env::var("LINGO_TAIL_LIMIT")
        .unwrap_or_else(|_| "50".into())
        .parse()?;
    // The real auth collaborator lives outside this core; the shell
    // reads a fixed identity from the environment.
    let uid = std::env::var("LINGO_USER_ID").unwrap_or_else(|_| "local-user".into());
    let avatar_url = std::env::var("LINGO_AVATAR_URL")
        .unwrap_or_else(|_| "https://example.org/avatar.png".into());

    // Store and relay
    let store = Arc::new(SqliteStore::open(&PathBuf::from(&db_path))?);
    let (relay, relay_handle) = RelayClient::connect(&relay_url, ReconnectPolicy::default())?;

    // Synchronizer
    let sync = Synchronizer::new(
        store,
        relay,
        SyncConfig {
            tail_limit,
            ..SyncConfig::default()
        },
    );
    let mut view = sync.view();
    let mut notices = sync.notices();

    let (command_tx, command_rx) = mpsc::channel(32);
    let loop_task = tokio::spawn(sync.run(command_rx));

    command_tx.send(SyncCommand::AuthPending).await?;
    command_tx
        .send(SyncCommand::AuthResolved(Some(Identity {
            uid: UserId::new(uid),
            avatar_url,
        })))
        .await?;

    // Print view updates as they land
    tokio::spawn(async move {
        while view.changed().await.is_ok() {
            let current = view.borrow_and_update().clone();
            for message in &current.messages {
                println!("[{}] {}", message.author_id, message.text);
            }
            if let Some(panel) = &current.translation {
                println!("-- {}: {}", panel.heading, panel.text);
            }
        }
    });

    // Surface send failures
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            let SyncNotice::SendFailed { text, reason } = notice;
            warn!("send failed ({reason}); kept for retry: {text}");
        }
    });

    info!(relay = %relay_url, db = %db_path, "lingo running; type a message, 't' to toggle translation, 'q' to quit");

    let mut translation_enabled = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.as_str() {
            "q" => break,
            "t" => {
                translation_enabled = !translation_enabled;
                command_tx
                    .send(SyncCommand::SetTranslationEnabled(translation_enabled))
                    .await?;
                info!(translation_enabled, "display mode toggled");
            }
            text => {
                command_tx
                    .send(SyncCommand::Submit {
                        text: text.to_owned(),
                    })
                    .await?;
            }
        }
    }

    command_tx.send(SyncCommand::Shutdown).await?;
    relay_handle.shutdown();
    loop_task.await?;
    Ok(())
}
