//! A terminal client for the Atena chat server.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use atena::commands::{self, Command, HELP};
use atena::config::Config;
use atena_core::{Blob, Client, ClientBuilder, Event, FileStorage};
use atena_http_backend::{HttpBackend, HttpBackendConfigBuilder};
use atena_model::{Conversation, ConversationId, Message, Role};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let storage = match FileStorage::open(&config.data_dir) {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!(
                "cannot open data directory {}: {err}",
                config.data_dir.display()
            );
            return;
        }
    };

    let backend = HttpBackend::new(
        HttpBackendConfigBuilder::new()
            .with_base_url(&config.base_url)
            .build(),
    );
    if let Err(err) = backend.health().await {
        println!(
            "{}⚠️  {} is not answering ({err}), messages may fail.",
            BAR_CHAR.bright_yellow(),
            config.base_url.bright_white()
        );
    }

    let client = ClientBuilder::with_backend(backend)
        .with_storage(storage)
        .with_locale(config.locale)
        .build();
    let mut events = client.subscribe();

    println!("🦉 Atena ({}). Type /help for commands.", config.locale);

    loop {
        let pending = client.attachments().await.map(|a| a.len()).unwrap_or(0);
        if pending > 0 {
            print!("{} > ", format!("[📎 {pending}]").bright_black());
        } else {
            print!("> ");
        }
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{}", err.red());
                continue;
            }
        };

        match command {
            Command::Send(text) => send(&client, &mut events, text).await,
            Command::New => match client.create_session().await {
                Ok(_) => println!("Started a new conversation."),
                Err(err) => eprintln!("{}", err.red()),
            },
            Command::List => list(&client).await,
            Command::Load(index) => load(&client, index).await,
            Command::Delete(index) => delete(&client, index).await,
            Command::Clear => clear(&client).await,
            Command::Attach(paths) => {
                let mut blobs = vec![];
                for path in paths {
                    match Blob::from_path(&path).await {
                        Ok(blob) => blobs.push(blob),
                        Err(err) => eprintln!(
                            "{}",
                            format!("cannot read {}: {err}", path.display()).red()
                        ),
                    }
                }
                let total = blobs.len();
                match client.attach(blobs).await {
                    Ok(accepted) if accepted < total => println!(
                        "Attached {accepted} image(s), skipped {} non-image file(s).",
                        total - accepted
                    ),
                    Ok(accepted) => println!("Attached {accepted} image(s)."),
                    Err(err) => eprintln!("{}", err.red()),
                }
            }
            Command::Detach => match client.clear_attachments().await {
                Ok(()) => println!("Dropped pending attachments."),
                Err(err) => eprintln!("{}", err.red()),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }
}

async fn send(
    client: &Client,
    events: &mut broadcast::Receiver<Event>,
    text: String,
) {
    if let Err(err) = client.set_input(text).await {
        eprintln!("{}", err.red());
        return;
    }
    let id = match client.send().await {
        Ok(id) => id,
        Err(err) => {
            eprintln!("{}", err.red());
            return;
        }
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style);
    progress_bar.set_message("🦉 Thinking...");

    let succeeded = loop {
        progress_bar.inc(1);
        let sleep = sleep(Duration::from_millis(100));
        select! {
            event = events.recv() => match event {
                Ok(Event::TurnResolved { conversation_id, succeeded })
                    if conversation_id == id => break succeeded,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => {
                    progress_bar.finish_and_clear();
                    return;
                }
            },
            _ = sleep => {}
        }
    };
    progress_bar.finish_and_clear();

    let reply = client
        .conversation(id.clone())
        .await
        .ok()
        .flatten()
        .and_then(|c| c.display_messages().last().cloned());
    match reply {
        Some(reply) if succeeded => print_message(&reply),
        Some(reply) => println!("{}{}", BAR_CHAR.red(), reply.plain_text().red()),
        None => warn!("turn in {id} resolved without a reply"),
    }
}

async fn list(client: &Client) {
    let summaries = match client.summaries().await {
        Ok(summaries) => summaries,
        Err(err) => {
            eprintln!("{}", err.red());
            return;
        }
    };
    if summaries.is_empty() {
        println!("No saved conversations.");
        return;
    }
    let active = client.active().await.ok();
    for (i, summary) in summaries.iter().enumerate() {
        let marker = if active.as_ref().map(Conversation::id) == Some(&summary.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker}{:>3}. {} {}",
            i + 1,
            summary.title.bright_white(),
            format!(
                "({} messages, {})",
                summary.message_count,
                summary.created_at.format("%Y-%m-%d %H:%M")
            )
            .bright_black()
        );
    }
}

async fn nth_conversation(client: &Client, index: usize) -> Option<ConversationId> {
    let summaries = client.summaries().await.ok()?;
    let id = summaries.into_iter().nth(index).map(|s| s.id);
    if id.is_none() {
        eprintln!("{}", format!("no conversation number {}", index + 1).red());
    }
    id
}

async fn load(client: &Client, index: usize) {
    let Some(id) = nth_conversation(client, index).await else {
        return;
    };
    if let Err(err) = client.load_session(id).await {
        eprintln!("{}", err.red());
        return;
    }
    if let Ok(conversation) = client.active().await {
        println!("── {} ──", conversation.title().bold());
        for msg in conversation.display_messages() {
            print_message(msg);
        }
    }
}

async fn delete(client: &Client, index: usize) {
    let Some(id) = nth_conversation(client, index).await else {
        return;
    };
    match client.delete_session(id).await {
        Ok(true) => println!("Deleted."),
        Ok(false) => println!("Nothing to delete."),
        Err(err) => eprintln!("{}", err.red()),
    }
}

async fn clear(client: &Client) {
    print!("Delete every conversation? This cannot be undone. [y/N]: ");
    std::io::stdout().flush().ok();
    let Some(line) = read_line().await else {
        return;
    };
    if !line.trim().eq_ignore_ascii_case("y") {
        return;
    }
    match client.clear_archive().await {
        Ok(()) => println!("Deleted every conversation."),
        Err(err) => eprintln!("{}", err.red()),
    }
}

fn print_message(msg: &Message) {
    let images = msg.image_previews.as_ref().map_or(0, Vec::len);
    let images = if images > 0 {
        format!(" [📎 {images}]")
    } else {
        String::new()
    };
    match msg.role {
        Role::User => println!(
            "{}{}{}",
            BAR_CHAR.bright_black(),
            msg.plain_text(),
            images.bright_black()
        ),
        Role::Assistant => println!(
            "{}🦉 {}",
            BAR_CHAR.bright_cyan(),
            msg.plain_text().bright_white()
        ),
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
