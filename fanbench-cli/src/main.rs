//! Fanbench CLI - fan one prompt out to many agents and record what comes back

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use fanbench_core::prelude::*;

#[derive(Parser)]
#[command(name = "fanbench")]
#[command(about = "Concurrent fan-out evaluation harness", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every benchmark prompt against the selected agents
    Bench {
        /// Agents to run, comma separated (default: all available)
        #[arg(short, long, value_delimiter = ',')]
        agents: Vec<AgentKey>,

        /// Per-call deadline in seconds
        #[arg(short, long, env = "FANBENCH_TIMEOUT")]
        timeout: Option<f64>,

        /// Prompts file (JSON list of {id, prompt, tags})
        #[arg(short, long)]
        prompts: Option<PathBuf>,

        /// JSON-lines output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Send one prompt to the selected agents, persist and print the records
    Ask {
        /// Prompt text
        prompt: String,

        /// Agents to ask, comma separated (default: all available)
        #[arg(short, long, value_delimiter = ',')]
        agents: Vec<AgentKey>,

        /// Per-call deadline in seconds
        #[arg(short, long, env = "FANBENCH_TIMEOUT")]
        timeout: Option<f64>,

        /// Print full records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive chat with one agent, logged to the chat log
    Chat {
        /// Agent to chat with
        #[arg(short, long, default_value = "gemini")]
        agent: AgentKey,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("fanbench {}", env!("CARGO_PKG_VERSION"));
            println!("fanbench-core {}", fanbench_core::VERSION);
        }
        Commands::Bench {
            agents,
            timeout,
            prompts,
            output,
        } => {
            let mut config = FanbenchConfig::load()?;
            if let Some(secs) = timeout {
                config.harness.call_timeout = parse_timeout(secs)?;
            }
            if let Some(path) = prompts {
                config.prompts_path = path;
            }
            if let Some(path) = output {
                config.storage.results_path = path;
            }
            bench(&config, &agents).await?;
        }
        Commands::Ask {
            prompt,
            agents,
            timeout,
            json,
        } => {
            let mut config = FanbenchConfig::load()?;
            if let Some(secs) = timeout {
                config.harness.call_timeout = parse_timeout(secs)?;
            }
            ask(&config, &prompt, &agents, json).await?;
        }
        Commands::Chat { agent } => {
            let config = FanbenchConfig::load()?;
            chat(&config, agent).await?;
        }
    }

    Ok(())
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .with_context(|| format!("invalid timeout: {}s", secs))
}

/// Only the exact word `exit` ends a chat; anything else is sent to the agent
fn is_exit_command(line: &str) -> bool {
    line == "exit"
}

/// Requested keys, or every built-in key when none were given
fn requested_keys(agents: &[AgentKey]) -> Vec<&'static str> {
    if agents.is_empty() {
        AgentKey::ALL.iter().map(AgentKey::as_str).collect()
    } else {
        agents.iter().map(AgentKey::as_str).collect()
    }
}

async fn bench(config: &FanbenchConfig, agents: &[AgentKey]) -> Result<()> {
    let registry = AgentRegistry::build(config);
    let selected = registry.select(&requested_keys(agents))?;

    let prompts = load_prompts(&config.prompts_path)
        .await
        .with_context(|| format!("loading prompts from {}", config.prompts_path.display()))?;

    let names: Vec<_> = selected.iter().map(|a| a.display_name()).collect();
    println!(
        "\nRunning {} prompt(s) x {} agent(s): {}\n",
        prompts.len(),
        selected.len(),
        names.join(", ")
    );

    let sink = Arc::new(JsonlSink::new(&config.storage.results_path));
    let runner = BenchmarkRunner::new(FanOut::from_config(config)).with_sink(sink);
    let records = runner.run(&prompts, &selected).await?;

    let summary = BenchmarkSummary::from_records(&records)
        .with_results_path(config.storage.results_path.display().to_string());
    println!("{}", summary);
    Ok(())
}

async fn ask(config: &FanbenchConfig, prompt: &str, agents: &[AgentKey], json: bool) -> Result<()> {
    let registry = AgentRegistry::build(config);
    let selected = registry.select(&requested_keys(agents))?;

    let records = FanOut::from_config(config)
        .run(&Prompt::adhoc(prompt), &selected)
        .await?;
    JsonlSink::new(&config.storage.results_path)
        .append(&records)
        .await?;

    if json {
        for record in &records {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        return Ok(());
    }

    for record in &records {
        let status = if record.passed() { "PASS" } else { "FAIL" };
        let latency = record
            .latency_sec
            .map(|l| format!("{:.3}s", l))
            .unwrap_or_else(|| "-".to_string());
        println!("[{}] {} ({}, {})", status, record.agent_name, record.agent_key, latency);
        println!("  {}", record.response);
        for failure in record.validation.failures() {
            if let Some(error) = &failure.error {
                println!("  - {}: {}", failure.validator, error);
            }
        }
    }
    if let Some(first) = records.first() {
        println!("\nfan-out latency: {:.3}s", first.fan_out_latency_sec);
    }
    Ok(())
}

async fn chat(config: &FanbenchConfig, key: AgentKey) -> Result<()> {
    let registry = AgentRegistry::build(config);
    let selected = registry.select(&[key.as_str()])?;
    let fan_out = FanOut::from_config(config);
    let log = ChatLog::new(&config.storage.chat_log_path);

    let display_name = selected[0].display_name().to_string();
    println!("Chatting with {}. Type 'exit' to quit.", display_name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let records = fan_out.run(&Prompt::adhoc(message), &selected).await?;
        let Some(record) = records.into_iter().next() else {
            continue;
        };

        println!("{}: {}", display_name, record.response);

        let entry = ChatLogEntry {
            user_message: message.to_string(),
            ai_response: record.response,
            model_name: record.agent_name,
            time_stamp: record.timestamp,
            fan_out_latency_sec: record.fan_out_latency_sec,
            agent_latency_last_sec: record.latency_sec,
            agent_latency_metrics: record.latency_metrics,
            validation: Some(record.validation),
        };
        if let Err(e) = log.log_run(&entry).await {
            tracing::warn!(error = %e, "failed to write chat log");
        }
    }

    println!("Bye!");
    Ok(())
}
