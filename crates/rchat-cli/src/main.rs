//! rchat - terminal chat client for the Gemini API

mod clipboard;
mod commands;
mod config;
mod ui;
mod utils;

use clap::Parser;
use rchat_ai::GeminiGateway;
use rchat_core::{
    ChatSession, ConversationConfig, ConversationState, FileSlot, HistoryStore, MemorySlot,
    SpeechInput, UnsupportedRecognizer, speech::DEFAULT_LOCALE,
};
use rchat_tui::{Feedback, Reaction};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// rchat - ask Gemini from your terminal
#[derive(Parser, Debug)]
#[command(name = "rchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gemini-2.0-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// Start in light mode
    #[arg(long, conflicts_with = "dark")]
    light: bool,

    /// Start in dark mode
    #[arg(long)]
    dark: bool,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Print the search history and exit
    #[arg(long)]
    history: bool,

    /// Delete the search history and exit
    #[arg(long)]
    clear_history: bool,

    /// Where the search history is stored
    #[arg(long, value_name = "PATH")]
    history_file: Option<PathBuf>,

    /// Keep history in memory only for this run
    #[arg(long, conflicts_with = "history_file")]
    no_history: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Install the tracing subscriber. In TUI mode logs go to a file so the
/// alternate screen stays clean.
fn init_logging(verbose: bool, use_tui: bool) {
    if !verbose {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("rchat=debug,rchat_core=debug,rchat_ai=debug,rchat_tui=debug")
    });

    if use_tui {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rchat");
        let file = std::fs::create_dir_all(&dir)
            .and_then(|_| std::fs::File::create(dir.join("rchat.log")));
        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .init();
            }
            Err(e) => eprintln!("Warning: cannot open log file: {}", e),
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Flags win over the config file; light mode otherwise
fn start_dark(args: &Args, cfg: &config::Config) -> bool {
    if args.light {
        false
    } else if args.dark {
        true
    } else {
        cfg.dark_mode.unwrap_or(false)
    }
}

fn load_history(args: &Args, cfg: &config::Config) -> HistoryStore {
    if args.no_history {
        return HistoryStore::load(MemorySlot::new());
    }
    match cfg.history_path(args.history_file.as_deref()) {
        Some(path) => HistoryStore::load(FileSlot::new(path)),
        None => {
            eprintln!("Warning: no data directory found; history will not be saved");
            HistoryStore::load(MemorySlot::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
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
    let use_tui = !args.no_tui && args.command.is_none() && cfg.tui.unwrap_or(true);
    init_logging(args.verbose, use_tui);

    let mut history = load_history(&args, &cfg);

    if args.history {
        println!("{}", commands::HistoryCommand::list_text(history.entries()));
        return Ok(());
    }

    if args.clear_history {
        let count = history.len();
        history.clear();
        history.persist()?;
        println!("Deleted {} history entries.", count);
        return Ok(());
    }

    let Some(api_key) = cfg.get_api_key() else {
        eprintln!("Error: No API key found for the Gemini API");
        eprintln!();
        eprintln!("Set your API key with: export GOOGLE_API_KEY=your-key");
        eprintln!("Or add it to config file: rchat --init-config");
        std::process::exit(1);
    };

    let gateway_config = cfg.gateway_config(args.model.as_deref());
    let model = gateway_config.model.clone();
    let gateway = GeminiGateway::new(api_key, gateway_config)?;

    let conversation = ConversationState::with_config(
        Arc::new(gateway),
        ConversationConfig {
            request_timeout: cfg.request_timeout(),
        },
    );
    let speech = SpeechInput::with_locale(
        UnsupportedRecognizer,
        cfg.speech_locale.as_deref().unwrap_or(DEFAULT_LOCALE),
    );
    let session = ChatSession::new(conversation, history, speech);

    // Non-interactive mode
    if let Some(command) = args.command.as_deref() {
        return run_command(&session, command).await;
    }

    let dark_mode = start_dark(&args, &cfg);

    if use_tui {
        let settings = ui::UiSettings {
            model,
            dark_mode,
            reveal_interval: cfg.reveal_interval(),
        };
        return ui::run_tui(&session, settings).await;
    }

    run_interactive(&session, &model).await
}

async fn run_command(session: &ChatSession, prompt: &str) -> anyhow::Result<()> {
    println!("rchat> {}", prompt);
    println!();

    match session.submit(prompt).await {
        Ok(Some(reply)) => {
            println!("{}", utils::render_plain(&reply, utils::terminal_width()));
            Ok(())
        }
        Ok(None) => {
            eprintln!("Nothing to send.");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_interactive(session: &ChatSession, model: &str) -> anyhow::Result<()> {
    use commands::{Command, HistoryCommand, help_message, parse_command, reply_target};
    use std::io::{self, Write};

    let mut feedback = Feedback::new();
    // Transcript from voice input, sent on an empty Enter
    let mut pending_input: Option<String> = None;

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("rchat ({})  /help for commands", model);
        eprintln!();
    }

    loop {
        match &pending_input {
            Some(text) => print!("[voice: {}] (Enter to send) > ", text),
            None => print!("> "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let line = input.trim_end_matches(['\n', '\r']);
        let line = match (line.trim().is_empty(), pending_input.take()) {
            (true, Some(transcript)) => transcript,
            (true, None) => continue,
            (false, _) => line.to_string(),
        };

        let Some(command) = parse_command(&line) else {
            print_turn(session.submit(&line).await.map(|r| r.map(|m| vec![m])));
            continue;
        };

        match command {
            Command::Help => println!("{}", help_message()),
            Command::Clear => {
                session.clear_conversation();
                feedback.clear();
                println!("Cleared conversation.");
            }
            Command::History => println!("{}", HistoryCommand::list_text(&session.history())),
            Command::Delete(index) => match session.delete_history(index) {
                Ok(entry) => println!("{}", HistoryCommand::deleted_text(index, &entry)),
                Err(e) => println!("Error: {}", e),
            },
            Command::Edit { index, text } => {
                let before = session.conversation().len();
                let result = session.edit_and_regenerate(index, &text).await;
                match &result {
                    Ok(messages) if messages.len() > before => feedback.shift_from(index + 1),
                    Ok(_) => feedback.reset(index + 1),
                    Err(_) => {}
                }
                print_turn(
                    result.map(|messages| messages.get(index + 1).cloned().map(|m| vec![m])),
                );
            }
            Command::Like(n) | Command::Dislike(n) => {
                let reaction = if matches!(command, Command::Like(_)) {
                    Reaction::Like
                } else {
                    Reaction::Dislike
                };
                match reply_target(&session.conversation().messages(), n) {
                    Ok(index) => match feedback.toggle(index, reaction) {
                        Some(r) => println!("Reply {} {} {}", index + 1, r.label(), r.icon()),
                        None => println!("Reaction removed from reply {}.", index + 1),
                    },
                    Err(msg) => println!("{}", msg),
                }
            }
            Command::Copy(n) => {
                let messages = session.conversation().messages();
                match reply_target(&messages, n) {
                    Ok(index) => match clipboard::copy_text(&messages[index].text) {
                        Ok(()) => println!("Copied reply {}.", index + 1),
                        Err(e) => println!("Error: {}", e),
                    },
                    Err(msg) => println!("{}", msg),
                }
            }
            Command::Theme => println!("Themes apply to the TUI only."),
            Command::Voice => match session.capture_speech().await {
                Ok(text) => pending_input = Some(text),
                Err(e) => println!("Voice input: {}", e),
            },
            Command::Quit => break,
            Command::Invalid(usage) => println!("{}", usage),
            Command::Unknown(cmd) => {
                println!("Unknown command: /{}", cmd);
                println!("Type /help for available commands.");
            }
        }
    }

    Ok(())
}

/// Print the reply of a finished turn, or why there is none
fn print_turn(result: rchat_core::Result<Option<Vec<rchat_core::Message>>>) {
    match result {
        Ok(Some(messages)) => {
            for message in messages {
                println!();
                println!("{}", utils::render_plain(&message, utils::terminal_width()));
                println!();
            }
        }
        Ok(None) => {}
        Err(e) => println!("Error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["rchat", "--light", "-m", "gemini-1.5-pro", "--no-tui"])
            .unwrap();
        assert!(args.light);
        assert!(args.no_tui);
        assert_eq!(args.model.as_deref(), Some("gemini-1.5-pro"));
    }

    #[test]
    fn test_starts_in_light_mode_by_default() {
        let args = Args::try_parse_from(["rchat"]).unwrap();
        assert!(!start_dark(&args, &config::Config::default()));

        let dark_config = config::Config {
            dark_mode: Some(true),
            ..Default::default()
        };
        assert!(start_dark(&args, &dark_config));

        let args = Args::try_parse_from(["rchat", "--light"]).unwrap();
        assert!(!start_dark(&args, &dark_config));
        let args = Args::try_parse_from(["rchat", "--dark"]).unwrap();
        assert!(start_dark(&args, &config::Config::default()));
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        assert!(Args::try_parse_from(["rchat", "--light", "--dark"]).is_err());
        assert!(
            Args::try_parse_from(["rchat", "--no-history", "--history-file", "/tmp/h.json"])
                .is_err()
        );
    }
}
