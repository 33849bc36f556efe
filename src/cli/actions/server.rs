use crate::{
    api,
    chat::{
        telegram::{self, TelegramBot},
        ChatLogin, ChatLoginConfig, LogMessenger, Messenger,
    },
    service::CredentialService,
    store::{self, dump_on_shutdown},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub data_dir: PathBuf,
    pub code_expiry_seconds: i64,
    pub telegram_bot_token: Option<SecretString>,
    pub telegram_api_url: String,
}

/// Execute the server action.
///
/// Snapshots are loaded before anything is served; the stores are written back
/// once on shutdown, whether the server stopped on a signal or on an error.
///
/// # Errors
/// Returns an error if a snapshot is corrupt, the bot token is malformed, or the
/// server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let (users, tokens) = store::open(&args.data_dir).with_context(|| {
        format!(
            "Failed to load snapshots from {}",
            args.data_dir.display()
        )
    })?;

    info!(
        users = users.len().await,
        tokens = tokens.len().await,
        "snapshots loaded from {}",
        args.data_dir.display()
    );

    let users = Arc::new(users);
    let tokens = Arc::new(tokens);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let dumps = vec![
        dump_on_shutdown(users.clone(), shutdown_rx.clone()),
        dump_on_shutdown(tokens.clone(), shutdown_rx.clone()),
    ];

    let service = CredentialService::new(users, tokens);
    let config = ChatLoginConfig::new().with_code_expiry_seconds(args.code_expiry_seconds);

    let bot = match args.telegram_bot_token {
        Some(token) => {
            telegram::check_token(&token)?;
            Some(Arc::new(TelegramBot::new(&args.telegram_api_url, token)?))
        }
        None => {
            warn!("No telegram bot token configured, login codes are only logged");
            None
        }
    };

    let messenger: Arc<dyn Messenger> = match &bot {
        Some(bot) => bot.clone(),
        None => Arc::new(LogMessenger),
    };

    let login = ChatLogin::new(service.clone(), messenger, config);

    let poller: Option<JoinHandle<()>> = bot.map(|bot| {
        tokio::spawn(bot.poll_updates(login.clone(), shutdown_rx.clone()))
    });

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_tx.send_replace(true);
    });

    let served = api::serve(args.port, api::router(service, login), shutdown_rx).await;

    if let Err(err) = &served {
        error!("Server stopped: {:#}", err);
    }

    // Covers the error path, where no signal flipped the flag.
    shutdown_tx.send_replace(true);

    for dump in dumps {
        if let Err(err) = dump.await {
            error!("Snapshot task failed: {}", err);
        }
    }

    if let Some(poller) = poller {
        if let Err(err) = poller.await {
            error!("Telegram poller failed: {}", err);
        }
    }

    served
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
