//! `parley`: terminal chat client.
//!
//! Reads lines from stdin, turns them into intents for the session runtime
//! and prints session events to stdout. Configuration comes from the
//! environment (see [`ClientConfig`]).

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use parley_client::terminal::{parse_line, Parsed, TerminalRenderer, HELP};
use parley_client::{init_tracing, ClientConfig, Intent, SessionRuntime, StaticAuthProvider};
use parley_shared::constants::APP_NAME;
use parley_shared::Credential;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env();
    info!(
        url = %config.server_url,
        tagged_channels = config.tagged_channels,
        "Starting {} client v{}",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );

    let auth = StaticAuthProvider::new(config.token.clone().and_then(Credential::new));
    let renderer = TerminalRenderer::new(std::io::stdout());
    let runtime = SessionRuntime::connect_ws(&config, auth, renderer);

    let (intent_tx, intent_rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            match parse_line(&line) {
                Parsed::Intent(intent) => {
                    if intent_tx.send(intent).await.is_err() {
                        return;
                    }
                }
                Parsed::Help => println!("{HELP}"),
                Parsed::Invalid(reason) => println!("! {reason}"),
                Parsed::Empty => {}
            }
        }
        let _ = intent_tx.send(Intent::Quit).await;
    });

    tokio::select! {
        result = runtime.run(intent_rx) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
