pub mod server;

/// What the process was asked to do once the command line is parsed.
#[derive(Debug)]
pub enum Action {
    /// Load snapshots, serve HTTP and poll Telegram until a shutdown signal.
    Server(server::Args),
}

impl Action {
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
        }
    }
}
