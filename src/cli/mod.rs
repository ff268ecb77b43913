use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::core::MemoryStore;
use crate::engine::Engine;
use crate::rules::Reply;
use crate::session::{is_exit_phrase, VoiceLoop};
use crate::speech::ConsoleSpeech;
use crate::telemetry::{self, TELEMETRY_INTERVAL};

pub use commands::{ConfigCommands, MemoryCommands};

mod commands;

fn print_reply(name: &str, reply: &Reply) {
    println!("{} {}", format!("{}:", name).cyan().bold(), reply.text);
    if let Some(image) = &reply.image {
        println!("{} {}", "Image:".yellow(), image);
    }
}

pub async fn handle_listen(data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let listen_timeout = Duration::from_secs(config.assistant.listen_timeout_secs);
    let name = config.assistant.name.clone();

    let engine = Arc::new(Engine::from_config(config, None)?);
    let stats = telemetry::spawn(engine.notifier().clone(), TELEMETRY_INTERVAL);

    println!(
        "{} say '{}' to wake me, Ctrl-C to quit",
        "Listening:".green().bold(),
        engine.config().assistant.wake_word
    );
    let speech = Arc::new(ConsoleSpeech::stdin(name, listen_timeout));
    let result = VoiceLoop::new(engine, speech).run().await;

    stats.abort();
    result
}

pub async fn handle_chat(data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let engine = Engine::from_config(config, None)?;
    let name = engine.config().assistant.name.clone();

    println!(
        "{} {} ({})",
        "Chatting with".cyan().bold(),
        name,
        engine.config().assistant.full_name
    );
    println!("{}", "Type 'exit' to quit.".yellow());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit_phrase(line) || line == "/exit" {
            break;
        }

        let language = engine.state().snapshot().current_language;
        if let Some(reply) = engine.process(line, &language).await {
            print_reply(&name, &reply);
        }
    }

    Ok(())
}

pub async fn handle_ask(text: String, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let engine = Engine::from_config(config, None)?;
    let language = engine.config().assistant.default_language.clone();

    match engine.process(&text, &language).await {
        Some(reply) => print_reply(&engine.config().assistant.name, &reply),
        None => println!("{}", "Nothing to ask.".yellow()),
    }
    Ok(())
}

pub async fn handle_memory(command: MemoryCommands, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let memory =
        MemoryStore::new(config.memory_db_file()).context("Failed to open memory database")?;

    match command {
        MemoryCommands::History { limit } => {
            let turns = memory.recent_turns(limit)?;
            if turns.is_empty() {
                println!("No conversation history.");
                return Ok(());
            }
            println!(
                "{} ({} of {})",
                "Conversation History".cyan().bold(),
                turns.len(),
                memory.turn_count()?
            );
            for turn in turns {
                println!(
                    "{} {}: {}",
                    turn.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    turn.role.to_string().green(),
                    turn.content
                );
            }
        }
        MemoryCommands::Get { category, key } => match memory.get_setting(&category, &key)? {
            Some(value) => println!("{}", value),
            None => println!("{}", format!("{}.{} is not set", category, key).yellow()),
        },
        MemoryCommands::Set { category, key, value } => {
            memory.set_setting(&category, &key, &value)?;
            println!("{} {}.{} = {}", "Saved".green(), category, key, value);
        }
        MemoryCommands::Context => {
            let summary = memory.context_summary()?;
            if summary.trim().is_empty() {
                println!("No stored memories.");
            } else {
                println!("{}", summary);
            }
        }
    }

    Ok(())
}

pub async fn handle_config(command: ConfigCommands, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;

    match command {
        ConfigCommands::Show => {
            let mut shown = config.clone();
            if let Some(cloud) = shown.cloud.as_mut() {
                if cloud.api_key.is_some() {
                    cloud.api_key = Some("********".to_string());
                }
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        ConfigCommands::Path => println!("{}", config.config_file().display()),
    }

    Ok(())
}
