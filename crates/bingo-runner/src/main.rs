mod app;
mod config;
mod input;
mod view;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bingo_http::HttpAuthority;

use app::App;
use config::RunnerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RunnerConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    let identity = match config.identity() {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("{e}; set BINGO_PLAYER_ID and BINGO_ROOM_ID or add them to bingo.toml");
            std::process::exit(1);
        },
    };

    let api = match HttpAuthority::new(&config.http()) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        },
    };

    tracing::info!(
        api = %config.api_url,
        room = %identity.room_id,
        player = %identity.player_id,
        "Bingo client starting"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            interrupt.cancel();
        }
    });

    let (line_tx, line_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let app = App::new(&api, identity, config.session, cancel, line_rx);
    if let Err(e) = app.run().await {
        tracing::error!("Session failed: {e}");
        std::process::exit(1);
    }
}
