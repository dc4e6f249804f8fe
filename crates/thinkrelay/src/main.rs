//! Inspect how `thinkrelay` splits streamed output and budgets prompts.
//!
//! # Examples
//!
//! ```sh
//! # Replay a stream chunk by chunk
//! thinkrelay split --chunk "<thi" --chunk "nk>reasoning" --chunk "</think> answer"
//!
//! # Split a complete response from stdin
//! cat response.txt | thinkrelay split --stdin
//!
//! # Budget a saved conversation
//! thinkrelay prompt --history chat.json --max-tokens 4096
//!
//! # With a config file and a different system prompt
//! thinkrelay prompt --history chat.json --config relay.json --system "Be terse."
//! ```
//!
//! Set `RUST_LOG=thinkrelay=debug` to see budgeting decisions on stderr.

use std::io::{self, Read};
use std::process;

use clap::{Parser, Subcommand};
use thinkrelay::Turn;
use thinkrelay::annotation::ExtractionResult;
use thinkrelay::config::ChatConfig;
use thinkrelay::context::PromptBudgeter;
use thinkrelay::stream::{StreamEvent, consume};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Inspect annotation splitting and prompt budgeting.
#[derive(Parser)]
#[command(name = "thinkrelay")]
struct Cli {
    /// JSON config file (all fields optional)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a response into its reasoning and visible channels
    Split {
        /// A streamed chunk; repeat to replay a stream in order
        #[arg(long = "chunk")]
        chunks: Vec<String>,

        /// Read the whole response from stdin as a single chunk
        #[arg(long)]
        stdin: bool,

        /// Print each snapshot as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Render a saved conversation into a prompt that fits the token budget
    Prompt {
        /// JSON array of {"role", "text"} turns, oldest first
        #[arg(long)]
        history: String,

        /// System prompt (overrides the config file)
        #[arg(long)]
        system: Option<String>,

        /// Model id, selects the chat template (overrides the config file)
        #[arg(long)]
        model: Option<String>,

        /// Prompt token ceiling (overrides the config file)
        #[arg(long)]
        max_tokens: Option<usize>,
    },
}

// ── Helpers ────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(path: Option<&str>) -> Result<ChatConfig, String> {
    match path {
        Some(path) => ChatConfig::from_json_file(path).map_err(|e| e.to_string()),
        None => Ok(ChatConfig::default()),
    }
}

fn read_stdin_content() -> Result<String, String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    Ok(buf)
}

fn format_snapshot(index: usize, split: &ExtractionResult, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string(split)
            .map_err(|e| format!("failed to serialize snapshot: {e}"));
    }
    let mut out = format!("── chunk {index} ({:?})\n", split.state);
    if !split.annotation.is_empty() {
        out.push_str(&format!("[thinking] {}\n", split.annotation));
    }
    out.push_str(&format!("[visible]  {}", split.visible));
    Ok(out)
}

// ── Subcommands ────────────────────────────────────────────────────

async fn run_split(
    config: &ChatConfig,
    chunks: &[String],
    stdin: bool,
    json: bool,
) -> Result<String, String> {
    let mut chunks = chunks.to_vec();
    if stdin {
        chunks.push(read_stdin_content()?);
    }
    if chunks.is_empty() {
        return Err("provide --chunk, --stdin, or both".to_string());
    }

    let events = chunks
        .into_iter()
        .map(|c| Ok::<_, String>(StreamEvent::TextDelta(c)))
        .chain(std::iter::once(Ok(StreamEvent::Done)));

    let mut lines = Vec::new();
    let mut failure = None;
    let done = consume(futures::stream::iter(events), &config.budget.markers, |split| {
        match format_snapshot(lines.len() + 1, split, json) {
            Ok(line) => lines.push(line),
            Err(e) => failure = Some(e),
        }
    })
    .await?;
    if let Some(e) = failure {
        return Err(e);
    }

    tracing::debug!("Replayed {} chunk(s)", done.chunks);
    Ok(lines.join("\n"))
}

fn run_prompt(
    mut config: ChatConfig,
    history_path: &str,
    system: Option<String>,
    model: Option<String>,
    max_tokens: Option<usize>,
) -> Result<String, String> {
    if let Some(system) = system {
        config = config.with_system_prompt(system);
    }
    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Some(max) = max_tokens {
        config = config.with_max_tokens(max);
    }

    let content = std::fs::read_to_string(history_path)
        .map_err(|e| format!("failed to read history file '{history_path}': {e}"))?;
    let history: Vec<Turn> = serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse history file '{history_path}': {e}"))?;

    let budgeter = PromptBudgeter::new(config.budget.clone());
    let built = budgeter
        .build(
            &config.system_prompt,
            &history,
            &config.template(),
            &config.counter(),
        )
        .map_err(|e| e.user_message())?;

    eprintln!("  [{}]", built.to_log_string());
    Ok(built.prompt_text)
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Command::Split {
                chunks,
                stdin,
                json,
            } => run_split(&config, &chunks, stdin, json).await,
            Command::Prompt {
                history,
                system,
                model,
                max_tokens,
            } => run_prompt(config, &history, system, model, max_tokens),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
