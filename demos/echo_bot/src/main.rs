//! Echo Bot Example
//!
//! Replies to every text message with the same text.
//!
//! The handler takes a single structured parameter. `IncomingMessage` is
//! deserialized from the `message` field of each update; updates of any other
//! kind fail extraction and are skipped.
//!
//! # Usage
//!
//! ```bash
//! SAKURA_BOT__TOKEN=123456:secret cargo run --package echo-bot
//! cargo run --package echo-bot -- --config sakura.toml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sakura::prelude::*;
use sakura::runtime::config::ConfigLoader;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "echo-bot", about = "Echoes text messages back to their sender")]
struct Args {
    /// Configuration file (defaults to sakura.toml in the current directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize, UpdatePayload)]
#[update(field = "message", crate = "sakura::core")]
struct IncomingMessage {
    message_id: i64,
    chat: Chat,
    text: Option<String>,
}

// ============================================================================
// Handler
// ============================================================================

async fn echo(api: BoxedTransport, message: IncomingMessage) -> Result<(), sakura::core::ApiError> {
    let Some(text) = message.text else {
        return Ok(());
    };

    info!(chat_id = message.chat.id, message_id = message.message_id, "Echoing message");

    api.call_as::<serde_json::Value>(
        "sendMessage",
        json!({
            "chat_id": message.chat.id,
            "text": text,
            "reply_parameters": { "message_id": message.message_id },
        }),
    )
    .await?;

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile.as_str());
    }
    let config = loader.load()?;

    // The handler needs the transport too, so build it here and share it
    let api = sakura::transport::build_transport(config.bot.to_client_config())?;
    let runtime = SakuraRuntime::from_config(&config).with_transport(api.clone());

    runtime
        .run(move |message: IncomingMessage| echo(api.clone(), message))
        .await?;

    Ok(())
}
