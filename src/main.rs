//! Jarvis - local AI assistant
//!
//! Keeps a bounded window of the current conversation, turns stored
//! personality preferences into a system prompt, and sends each turn to a
//! local model server (Ollama by default).

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod conversation;
mod core;
mod providers;

use crate::commands::Command;
use crate::config::Config;
use crate::core::{ChatEngine, JsonFileStore};
use crate::providers::{Generator, Provider};

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jarvis=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    println!("{}", "=".repeat(60));
    println!("JARVIS - Local AI Assistant");
    println!("{}", "=".repeat(60));
    println!("\nInitializing...");

    let provider = Arc::new(Provider::from_config(&config.llm)?);
    let store = Arc::new(JsonFileStore::new(config.preferences_path()));
    tracing::info!(path = %store.path().display(), "Using preference store");
    let mut engine = ChatEngine::new(
        provider.clone(),
        store,
        config.conversation.max_turns,
    );

    if provider.check_availability().await {
        println!("✓ {} service connected", provider.name());
        println!("✓ Model: {}", provider.model());
        let personality = engine.personality();
        println!(
            "✓ Personality: {}, {}",
            personality.tone.as_str(),
            personality.verbosity.as_str()
        );
        println!("✓ Memory: last {} turns", engine.conversation().capacity());
    } else {
        println!("\n⚠️  WARNING: {} service not detected at {}", provider.name(), config.llm.endpoint);
        if config.llm.provider.eq_ignore_ascii_case("ollama") {
            println!("Please install Ollama from https://ollama.ai");
            println!("Then run: ollama pull {}", config.llm.model);
            println!("And start the service: ollama serve");
        }
        println!("\nContinuing anyway (responses will report the error)...");
    }

    println!("\n{}", commands::HELP);
    println!("\nReady! Start chatting...\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(input) = prompt(&mut lines, "You: ").await? else {
            println!("\nGoodbye!");
            break;
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match Command::parse(input) {
            None => {
                let response = engine.process_input(input).await;
                println!("\nJarvis: {}\n", response);
            }
            Some(Command::Quit) => {
                println!("\nGoodbye!");
                break;
            }
            Some(Command::Export) => {
                if engine.conversation().is_empty() {
                    println!("\n(no turns recorded yet)");
                }
                let json = engine.export_conversation().to_json()?;
                println!("\n{}\n", json);
            }
            Some(Command::Clear) => {
                let confirm = prompt(&mut lines, "Clear conversation history? (yes/no): ").await?;
                if confirm.is_some_and(|answer| answer.trim().eq_ignore_ascii_case("yes")) {
                    let cleared = engine.conversation().size();
                    engine.clear_conversation();
                    println!(
                        "\nConversation history cleared ({} turns). New session {}.\n",
                        cleared,
                        engine.conversation().session_id()
                    );
                }
            }
            Some(Command::Personality) => {
                let personality = serde_json::to_string_pretty(engine.personality())?;
                println!("\n{}\n", personality);
            }
            Some(Command::Set(changes)) => match engine.update_personality(&changes) {
                Ok(applied) if applied.is_empty() => {
                    println!("\nNothing changed (unknown field or invalid value).\n");
                }
                Ok(applied) => println!("\nUpdated: {}\n", applied.join(", ")),
                Err(e) => println!("\nError: could not save preferences: {}\n", e),
            },
            Some(Command::Help) => println!("\n{}\n", commands::HELP),
            Some(Command::Unknown(command)) => {
                println!("\nUnknown command: {}\n\n{}\n", command, commands::HELP);
            }
        }
    }

    Ok(())
}

/// Print `label` and read one line; `None` on end of input
async fn prompt(lines: &mut InputLines, label: &str) -> std::io::Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    lines.next_line().await
}
