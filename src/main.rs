//! Command-line client: attach documents to a message and print the agent's
//! reply as it streams in.

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use tracing_subscriber::EnvFilter;

use docrelay::{
    Cli, Conversation, DeliveryOutcome, Error, HttpAgent, OutgoingMessage, UploadState,
    ingest_paths,
};

const EMPTY_REPLY: &str =
    "I received your message but couldn't generate a proper response. Please try again.";
const DELIVERY_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let uploads = ingest_paths(&cli.files).await;
    report_intake(&uploads);

    if cli.extract_only {
        for attachment in &uploads.ready {
            if let Some(text) = &attachment.extracted_text {
                println!("--- {} ---\n{}", attachment.name, text);
            }
        }
        return Ok(());
    }

    let message = OutgoingMessage::compose(&cli.message, &uploads.ready);
    if message.is_empty() && cli.files.is_empty() {
        return Ok(());
    }

    let config = cli.agent_config();
    let backend = HttpAgent::new(config.clone())?;
    let mut conversation = Conversation::new(backend, config);
    if cli.no_stream {
        conversation = conversation.without_streaming();
    }

    let mut streamed = false;
    let mut print_delta = |delta: &str| {
        streamed = true;
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(delta.as_bytes());
        let _ = stdout.flush();
    };

    match conversation.deliver(&message, &mut print_delta).await {
        DeliveryOutcome::Streamed(_) => println!(),
        DeliveryOutcome::FellBack(reply) => {
            // Close any fragment a broken stream left behind
            if streamed {
                println!();
            }
            if reply.trim().is_empty() {
                eprintln!("{EMPTY_REPLY}");
            } else {
                println!("{reply}");
            }
        }
        DeliveryOutcome::Failed(
            e @ (Error::DeliveryFailed(_) | Error::SessionCreationFailed(_)),
        ) => {
            eprintln!("{DELIVERY_APOLOGY}");
            return Err(e.into());
        }
        DeliveryOutcome::Failed(e) => return Err(e.into()),
    }

    Ok(())
}

fn report_intake(uploads: &UploadState) {
    for notice in &uploads.notices {
        eprintln!("{notice}");
    }
    if let Some(summary) = uploads.summary() {
        eprintln!("{summary}");
    }
}
