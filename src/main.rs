use anyhow::Context;
use colored::Colorize;
use consulting_prep::ai::{ChatBackend, WebhookBackend};
use consulting_prep::chat::{ChatController, SubmitOutcome};
use consulting_prep::config::Config;
use consulting_prep::markdown::render_terminal;
use consulting_prep::session::Session;
use consulting_prep::types::{ChatMessage, Role};
use std::io::Write;
use std::time::Duration;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

const WAITING_TICK: Duration = Duration::from_millis(400);

fn load_dotenv() -> bool {
    dotenvy::dotenv().is_ok()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() -> anyhow::Result<()> {
    let loaded_env = load_dotenv();
    init_tracing();
    if loaded_env {
        tracing::debug!("loaded .env");
    }

    // Must be read before the runtime spawns any threads.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let config = Config::from_env().context("invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(config, offset))
}

async fn run(config: Config, offset: UtcOffset) -> anyhow::Result<()> {
    let backend =
        WebhookBackend::new(config.webhook_url.as_str()).context("failed to build HTTP client")?;
    let session = Session::start();
    tracing::info!(
        session = %session.id(),
        endpoint = %backend.endpoint(),
        "chat session started"
    );
    let mut chat = ChatController::new(session, backend);

    print_banner();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt()?;
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/session" => {
                println!("{}", chat.session().id());
                continue;
            }
            "/history" => {
                if chat.transcript().is_empty() {
                    print_empty_state();
                } else {
                    print_messages(chat.transcript().messages(), offset);
                }
                continue;
            }
            _ => {}
        }

        let seen = chat.transcript().len();
        chat.set_input(line);
        if matches!(submit_with_indicator(&mut chat).await, SubmitOutcome::Ignored) {
            continue;
        }
        // The user's own line is already on screen.
        print_messages(chat.messages_since(seen + 1), offset);
    }

    let lasted = OffsetDateTime::now_utc() - chat.session().started_at();
    tracing::info!(
        session = %chat.session().id(),
        messages = chat.transcript().len(),
        seconds = lasted.whole_seconds(),
        "chat session ended"
    );
    Ok(())
}

/// Drive one submission while printing a waiting indicator for as long as
/// the controller reports busy.
async fn submit_with_indicator<B: ChatBackend>(chat: &mut ChatController<B>) -> SubmitOutcome {
    let busy = chat.busy_handle();
    let submit = chat.submit_input();
    tokio::pin!(submit);

    let mut ticker = tokio::time::interval(WAITING_TICK);
    let mut waiting = false;
    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            _ = ticker.tick() => {
                if busy.is_busy() {
                    let mark = if waiting { "." } else { "Thinking" };
                    eprint!("{}", mark.dimmed());
                    waiting = true;
                }
            }
        }
    };
    if waiting {
        eprintln!();
    }
    outcome
}

fn print_banner() {
    println!("{}", "Consulting Prep AI".bold());
    println!("{}", "Your Personal Consulting Prep Partner".bold().cyan());
    println!(
        "Practice cases, guesstimates, and interview prep with an AI senior who guides you step by step."
    );
    println!();
    print_empty_state();
    println!(
        "{}",
        "Type your message and press Enter. /history, /session, /quit".dimmed()
    );
    println!();
}

fn print_empty_state() {
    println!("{}", "Start a conversation with your AI consulting prep partner".italic());
}

fn print_prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{} ", ">".cyan().bold())?;
    stdout.flush()
}

fn print_messages(messages: &[ChatMessage], offset: UtcOffset) {
    for msg in messages {
        let stamp = msg
            .created_at
            .to_offset(offset)
            .format(MESSAGE_TIME_FORMAT)
            .unwrap_or_default();
        let label = match msg.role {
            Role::User => msg.role.label().cyan().bold(),
            Role::Assistant => msg.role.label().green().bold(),
        };
        println!("{label} {}", stamp.dimmed());
        println!("{}", render_terminal(&msg.content));
        println!();
    }
}
