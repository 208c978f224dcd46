//! souveraine - terminal client for IA Souveraine Burkina

mod capture;
mod commands;
mod config;
mod ui;

use anyhow::Context;
use clap::Parser;
use souveraine_api::{Backend, HttpGateway};
use souveraine_core::{
    Category, FileStore, KeyValueStore, Language, Message, PersistedStore, Role, SendOutcome,
    SessionCoordinator, StatusMonitor, StoreKey,
    content::{LineKind, format_content},
};
use std::path::PathBuf;
use std::sync::Arc;

use commands::CommandResult;

/// souveraine - ask the sovereign AI of Burkina Faso
#[derive(Parser, Debug)]
#[command(name = "souveraine")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (default: http://localhost:8000)
    #[arg(long)]
    base_url: Option<String>,

    /// Question category (general, agriculture, sante, education, culture,
    /// technologie, economie, droit)
    #[arg(long)]
    category: Option<String>,

    /// Answer language (fr, mo, di)
    #[arg(short, long)]
    language: Option<String>,

    /// Send a single message and print the answer
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Send a recorded audio file as a voice message and print the answer
    #[arg(long)]
    voice: Option<PathBuf>,

    /// Attach a document to the message given with --command
    #[arg(long)]
    upload: Option<PathBuf>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// List saved conversations
    #[arg(long)]
    conversations: bool,

    /// Resume a conversation by list position or id
    #[arg(long)]
    resume: Option<String>,

    /// Check whether the backend is reachable
    #[arg(long)]
    status: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("souveraine=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI flags win over the environment, which wins over the file
    let base_url = args.base_url.clone().unwrap_or_else(|| cfg.base_url());
    let gateway = HttpGateway::with_config(cfg.gateway_config(base_url))
        .context("invalid backend configuration")?;
    let base_url = gateway.base_url().to_string();
    let backend: Arc<dyn Backend> = Arc::new(gateway);

    let data_dir = cfg.data_dir.clone().unwrap_or_else(FileStore::default_dir);
    let file_store = FileStore::open(&data_dir)
        .with_context(|| format!("cannot open data directory {}", data_dir.display()))?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(file_store);
    let store = PersistedStore::new(kv.clone());
    if let Some(theme) = cfg.theme() {
        if kv.get(StoreKey::Theme).is_none() {
            store.set_theme(theme)?;
        }
    }

    let coordinator = Arc::new(SessionCoordinator::new(store, backend.clone()));

    let category = match args.category.as_deref() {
        Some(name) => Category::parse(name).with_context(|| format!("unknown category: {}", name))?,
        None => cfg.category(),
    };
    let language = match args.language.as_deref() {
        Some(code) => Language::parse(code).with_context(|| format!("unknown language: {}", code))?,
        None => cfg.language(),
    };
    coordinator.set_category(category);
    coordinator.set_language(language);

    if args.conversations {
        let conversations = coordinator.conversations();
        if conversations.is_empty() {
            println!("No saved conversations.");
        } else {
            println!(
                "{}",
                commands::conversation_listing(&conversations, coordinator.active_id().as_deref())
            );
        }
        return Ok(());
    }

    if args.status {
        let online = backend.check_status().await;
        println!(
            "{}: {}",
            base_url,
            if online { "en ligne" } else { "hors ligne" }
        );
        if !online {
            std::process::exit(1);
        }
        return Ok(());
    }

    if let Some(ref target) = args.resume {
        let conversations = coordinator.conversations();
        let Some(conversation) = commands::find_conversation(&conversations, target) else {
            eprintln!("Error: no conversation matches '{}'", target);
            std::process::exit(1);
        };
        coordinator.select_conversation(&conversation.id)?;
        eprintln!(
            "Resuming \"{}\" ({} messages)",
            conversation.title, conversation.message_count
        );
    }

    if let Some(ref path) = args.upload {
        let result = commands::MessageCommand::upload(&path.to_string_lossy(), &coordinator);
        if coordinator.staged_attachment().is_none() {
            if let CommandResult::Message(msg) = result {
                eprintln!("Error: {}", msg);
            }
            std::process::exit(1);
        }
    }

    if let Some(path) = args.voice {
        let capture = capture::FileCapture::new(path);
        let outcome = coordinator.capture_and_send_voice(&capture).await;
        return print_outcome(&coordinator, outcome, &base_url);
    }

    if args.command.is_some() || args.upload.is_some() {
        let text = args.command.unwrap_or_default();
        let outcome = coordinator.send_text(&text).await;
        return print_outcome(&coordinator, outcome, &base_url);
    }

    let monitor = StatusMonitor::spawn(backend, cfg.status_interval());

    let use_tui = !args.no_tui && cfg.tui.unwrap_or(true);
    let result = if use_tui {
        ui::run_tui(coordinator, &monitor, base_url).await
    } else {
        run_interactive(&coordinator, &monitor, &base_url).await
    };
    monitor.stop();
    result
}

/// Print the messages a send appended and map failures to an exit code
fn print_outcome(
    coordinator: &SessionCoordinator,
    outcome: souveraine_core::Result<SendOutcome>,
    base_url: &str,
) -> anyhow::Result<()> {
    match outcome {
        Ok(SendOutcome::Reconciled {
            conversation_id,
            message,
        }) => {
            tracing::debug!(%conversation_id, "exchange complete");
            print_message(&message, base_url);
            if let Some(session) = coordinator.session_id() {
                tracing::debug!(%session, "guest session");
            }
            Ok(())
        }
        Ok(SendOutcome::Failed { error, .. }) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
        Ok(SendOutcome::Ignored) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Plain-text rendering of one message for stdout
fn print_message(message: &Message, base_url: &str) {
    match message.role {
        Role::Assistant => {
            for line in format_content(message.display_text()) {
                let text = line.plain_text();
                match line.kind {
                    LineKind::Plain => println!("{}", text),
                    LineKind::Bullet => println!("  • {}", text),
                    LineKind::Numbered(n) => println!("  {}. {}", n, text),
                }
            }
            if let Some(transcription) = &message.transcription {
                println!("  🎤 « {} »", transcription);
            }
            if !message.sources.is_empty() {
                println!("  📚 Sources: {}", message.sources.join(", "));
            }
            if let Some(url) = &message.audio_url {
                let mode = message.audio_mode.unwrap_or_default();
                println!(
                    "  🔊 {}: {}",
                    mode.label(),
                    souveraine_api::resolve_url(base_url, url)
                );
            }
            for suggestion in &message.suggestions {
                println!("  💡 {}", suggestion);
            }
        }
        Role::User => println!("vous> {}", message.content),
        Role::System => eprintln!("{}", message.content),
    }
}

async fn run_interactive(
    coordinator: &SessionCoordinator,
    monitor: &StatusMonitor,
    base_url: &str,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let category = coordinator.category();
        eprintln!(
            "IA Souveraine Burkina ({} {}, {}) - /help pour les commandes",
            category.icon(),
            category.label(),
            coordinator.language().label()
        );
        if let Some(active) = coordinator.active_conversation() {
            eprintln!("Conversation: {}", active.title);
        }
        eprintln!();
    }

    let mut was_online = monitor.status();
    loop {
        let online = monitor.status();
        if online == Some(false) && was_online != Some(false) {
            eprintln!("Le backend est hors ligne ⚠️");
        }
        was_online = online;

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            let Some(result) = commands::execute_command(input, coordinator) else {
                continue;
            };
            match result {
                CommandResult::Exit => break,
                CommandResult::Message(msg) => println!("{}", msg),
                CommandResult::Draft(text) => {
                    println!("Brouillon (copiez et modifiez):\n{}", text);
                }
                CommandResult::Voice(path) => {
                    let capture = capture::FileCapture::new(path);
                    match coordinator.capture_and_send_voice(&capture).await {
                        Ok(SendOutcome::Reconciled { message, .. }) => {
                            print_message(&message, base_url)
                        }
                        Ok(SendOutcome::Failed { error, .. }) => eprintln!("Error: {}", error),
                        Ok(SendOutcome::Ignored) => {}
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                CommandResult::CheckStatus => {
                    let online = coordinator.check_status().await;
                    println!("{}", if online { "En ligne ✅" } else { "Hors ligne ⚠️" });
                }
                CommandResult::Unknown(cmd) => {
                    println!("Commande inconnue: /{} (essayez /help)", cmd);
                }
            }
            continue;
        }

        match coordinator.send_text(input).await {
            Ok(SendOutcome::Reconciled { message, .. }) => print_message(&message, base_url),
            Ok(SendOutcome::Failed { error, .. }) => eprintln!("Error: {}", error),
            Ok(SendOutcome::Ignored) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
        println!();
    }

    Ok(())
}
