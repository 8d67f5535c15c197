//! MB-AI chat service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build moderation, model provider, tools and the system prompt
//!   6. Open the chat history store
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run comms (axum) until shutdown

use std::io::Write as _;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use mbai_bot::bootstrap::logger;
use mbai_bot::chat::{ChatService, ChatStore, JsonFileStore};
use mbai_bot::subsystems::comms;
use mbai_bot::{config, error};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), error::AppError> {
    // Load .env if present: ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    // Layers are stamped with the local start-up time once.
    let chat = Arc::new(ChatService::from_config(&config, &chrono::Local::now())?);

    let store: Option<Arc<dyn ChatStore>> = if config.history.enabled {
        let store = JsonFileStore::new(config.history_path());
        info!(path = %store.path().display(), "chat history store ready");
        Some(Arc::new(store))
    } else {
        None
    };

    // Shared shutdown token: Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config, &chat);

    let handle = comms::start(&config, chat, store, shutdown.clone());
    handle.join().await?;

    shutdown.cancel();
    let _ = std::io::stderr().flush();

    Ok(())
}

fn print_startup_summary(config: &config::Config, chat: &ChatService) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 58;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let http_line = if config.comms.http.enabled {
        format!("🌐 http: {}", config.comms.http.bind)
    } else {
        "🌐 http: disabled".to_string()
    };

    let llm_line = match chat.provider_name() {
        "dummy" => "provider=dummy (echo)".to_string(),
        provider => format!(
            "provider={} model={} temp={} timeout={}s",
            provider,
            config.llm.openai.model,
            config.llm.openai.temperature,
            config.llm.openai.timeout_seconds
        ),
    };

    let tools = chat.tool_names();
    let tools_line = if tools.is_empty() { "none".to_string() } else { tools.join(", ") };

    let history_line = if config.history.enabled {
        config.history_path().display().to_string()
    } else {
        "disabled".to_string()
    };

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ 🎓 MB-AI Chat Service                                        ║");
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 🧾 Bot: {:<52}║", config.bot_name);
    println!("║ 🧠 PID: {:<52}║", std::process::id());
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 📡 Comms                                                     ║");
    println!("║   {}║", fit(http_line));
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 🧠 LLM                                                       ║");
    println!("║   {}║", fit(llm_line));
    println!(
        "║   {}║",
        fit(format!(
            "max_steps={} max_duration={}s effort={}",
            chat.max_steps(),
            chat.max_duration().as_secs(),
            config.chat.reasoning_effort
        ))
    );
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 🛡️  Moderation                                                ║");
    println!("║   {}║", fit(chat.moderator_name().to_string()));
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 🧰 Tools                                                     ║");
    println!("║   {}║", fit(tools_line));
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 📝 Prompt                                                    ║");
    println!(
        "║   {}║",
        fit(format!(
            "profile={} layers={}",
            chat.prompt().profile().name(),
            chat.prompt().messages().len()
        ))
    );
    println!("║   {}║", fit(format!("history: {history_line}")));
    println!("╚══════════════════════════════════════════════════════════════╝");
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: mbai-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier:
    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug  (turn state transitions, tool calls)
    //   -vvvv+  → trace  (full request payloads)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
