//! # Scenecraft CLI
//!
//! Command-line interface for running the scene-building agent.
//!
//! Usage:
//!   scenecraft <goal>
//!   scenecraft --credits-reset --export scene.json <goal>
//!
//! Examples:
//!   scenecraft "a cozy cabin in a snowy forest"
//!   scenecraft --delay-ms 0 --export world.json "a small harbor at dusk"
//!   scenecraft --model claude-sonnet-4-20250514 "a desert oasis at night"

use clap::Parser;
use scenecraft_agent::{
    AgentHandle, AgentLoop, BlockReason, ClaudeProvider, CreditStore, FileCreditStore,
    ProviderConfig, SessionState, StopReason, ThoughtStatus, DEFAULT_CREDITS,
};
use scenecraft_scene::{export_json, SceneStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scenecraft")]
#[command(author, version, about = "Scenecraft - an agent that builds 3D scenes from a goal")]
struct Cli {
    /// The build goal, e.g. "a cozy cabin in a snowy forest"
    #[arg(trailing_var_arg = true, required = true)]
    goal: Vec<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Model used for proposals
    #[arg(short, long, env = "SCENECRAFT_MODEL")]
    model: Option<String>,

    /// Delay between commands in milliseconds
    #[arg(long, default_value_t = 1500)]
    delay_ms: u64,

    /// Directory holding persisted state (the credit ledger)
    #[arg(long, default_value = ".scenecraft")]
    state_dir: String,

    /// Reset the persisted credit balance to the default before starting
    #[arg(long)]
    credits_reset: bool,

    /// Write the final scene as JSON to this path
    #[arg(short, long)]
    export: Option<String>,

    /// Verbose output (print each command's parameters)
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only print the outcome
    #[arg(short, long)]
    quiet: bool,
}

/// Dev diagnostics go to stderr via RUST_LOG; user-facing progress stays on
/// stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}…", &s[..max_len])
    }
}

/// Follow the thought log and stream new entries to stdout.
async fn follow_thoughts(handle: AgentHandle, verbose: bool) {
    let mut printed = 0;
    loop {
        let snapshot = handle.snapshot();
        for entry in snapshot.thoughts.iter().skip(printed) {
            println!("  [{}] {}", entry.id, entry.thought);
            if verbose {
                println!("        -> {}", entry.command.describe());
            } else {
                println!("        -> {}", entry.command.action);
            }
        }
        printed = snapshot.thoughts.len();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let goal = cli.goal.join(" ");

    let ledger = match FileCreditStore::new(&cli.state_dir) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Failed to open state dir {}: {}", cli.state_dir, e);
            std::process::exit(1);
        }
    };

    if cli.credits_reset {
        if let Err(e) = ledger.save(DEFAULT_CREDITS) {
            eprintln!("Failed to reset credits: {}", e);
            std::process::exit(1);
        }
    }
    let credits = scenecraft_agent::ledger::load_or_default(&ledger);

    if !cli.quiet {
        println!("Scenecraft - building: {}", goal);
        println!("Credits: {}\n", credits);
    }

    let mut provider_config = ProviderConfig::new(cli.api_key);
    if let Some(model) = cli.model {
        provider_config = provider_config.with_model(model);
    }
    let provider = ClaudeProvider::new(provider_config);

    let session = SessionState::new(credits)
        .with_goal(&goal)
        .with_step_delay(Duration::from_millis(cli.delay_ms));

    let (agent, handle) = AgentLoop::new(
        SceneStore::initialized(),
        provider,
        session,
        Arc::new(ledger),
    );

    let printer = if cli.quiet {
        None
    } else {
        Some(tokio::spawn(follow_thoughts(handle.clone(), cli.verbose)))
    };

    let mut task = tokio::spawn(agent.run());
    let result = loop {
        tokio::select! {
            result = &mut task => break result.expect("agent loop panicked"),
            _ = tokio::signal::ctrl_c() => {
                if !cli.quiet {
                    println!("\nStopping...");
                }
                handle.stop();
            }
        }
    };

    if let Some(printer) = printer {
        printer.abort();
    }

    let session = handle.snapshot();

    if !cli.quiet {
        println!("\n--- Thought Log ({} entries) ---", session.thoughts.len());
        for entry in &session.thoughts {
            let status = match entry.status {
                ThoughtStatus::Pending => "pending",
                ThoughtStatus::Executing => "executing",
                ThoughtStatus::Completed => "ok",
                ThoughtStatus::Error => "err",
            };
            println!(
                "  [{:>3}] {} {}",
                status,
                entry.command.action,
                truncate(&entry.thought, 60)
            );
        }
        println!(
            "\nCommands accepted: {} | Credits remaining: {}",
            session.command_history.len(),
            session.credits
        );
    }

    if let Some(path) = &cli.export {
        match export_json(&result.store) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    eprintln!("Failed to write {}: {}", path, e);
                    std::process::exit(1);
                }
                if !cli.quiet {
                    println!("Scene exported to {}", path);
                }
            }
            Err(e) => {
                eprintln!("Export failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    match result.reason {
        StopReason::Completed => {
            println!("\n=== SCENE COMPLETE ===");
        }
        StopReason::Aborted => {
            // Expected outcome of an explicit stop, not an error
            println!("\nStopped.");
        }
        StopReason::Blocked(BlockReason::NoCredits) => {
            eprintln!("\nNo credits remaining. Re-run with --credits-reset to start over.");
            std::process::exit(1);
        }
        StopReason::Blocked(BlockReason::SceneNotReady) => {
            eprintln!("\nScene not initialized.");
            std::process::exit(1);
        }
        StopReason::CreditsExhausted => {
            eprintln!("\nOut of credits. Re-run with --credits-reset to start over.");
            std::process::exit(1);
        }
        StopReason::SafetyLimitReached => {
            eprintln!("\n{}", session.error.as_deref().unwrap_or("Command limit reached"));
            std::process::exit(1);
        }
        StopReason::Failed(err) => {
            eprintln!("\nError: {}", err);
            std::process::exit(1);
        }
    }
}
