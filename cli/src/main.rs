// Copyright (c) 2026 Durable Agent Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `durable-agent` — a chat client for the durable agentic orchestrator.
//!
//! Every conversation is backed by a long-lived workflow: `chat` starts or
//! resumes one and prints the agent's reply; `repl` keeps a terminal session
//! open against a single workflow until the user ends it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write as _;

use durable_agent_cli::runtime;
use durable_agent_core::application::workflow_service::WorkflowService;
use durable_agent_core::domain::workflow::WorkflowId;

/// Durable Agent Orchestrator chat client.
#[derive(Parser)]
#[command(name = "durable-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the agent's reply.
    Chat {
        /// The message text.
        message: String,

        /// Resume an existing workflow instead of starting a new one.
        #[arg(long, value_name = "WORKFLOW_ID")]
        workflow_id: Option<String>,

        /// Display name recorded against the conversation.
        #[arg(long, default_value = "cli-user")]
        user: String,
    },

    /// Start an interactive session against one workflow.
    Repl {
        #[arg(long, value_name = "WORKFLOW_ID")]
        workflow_id: Option<String>,

        #[arg(long, default_value = "cli-user")]
        user: String,
    },

    /// Print resolved startup configuration.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let engine = runtime::bootstrap().context("failed to bootstrap durable-workflow engine")?;
    let service = WorkflowService::new(&engine);

    match cli.command {
        Some(Commands::Chat { message, workflow_id, user }) => {
            let workflow_id = parse_workflow_id(workflow_id)?;
            let state = service
                .process_message(message, workflow_id, user)
                .await
                .context("failed to process message")?;
            println!("{}", state.last_response.unwrap_or_default());
            eprintln!("{}", format!("workflow: {}", state.workflow_id).dimmed());
        }
        Some(Commands::Repl { workflow_id, user }) => run_repl(&service, workflow_id, user).await?,
        Some(Commands::Config) => print_config(),
        None => run_repl(&service, None, "cli-user".to_string()).await?,
    }

    Ok(())
}

fn parse_workflow_id(raw: Option<String>) -> Result<Option<WorkflowId>> {
    raw.map(WorkflowId::new).transpose().map_err(Into::into)
}

async fn run_repl(service: &WorkflowService<'_>, workflow_id: Option<String>, user: String) -> Result<()> {
    let mut workflow_id = parse_workflow_id(workflow_id)?;

    println!("{}", "Durable Agent Orchestrator — type 'exit' to end the conversation.".bold());
    loop {
        print!("{}", "> ".cyan());
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            if let Some(id) = &workflow_id {
                service.end(id).await.context("failed to end workflow")?;
            }
            break;
        }

        let state = service
            .process_message(line.to_string(), workflow_id.clone(), user.clone())
            .await
            .context("failed to process message")?;
        workflow_id = Some(state.workflow_id.clone());
        println!("{}", state.last_response.unwrap_or_default());
    }

    Ok(())
}

fn print_config() {
    let config = durable_agent_core::infrastructure::config::AppConfig::from_env();
    println!("{config:#?}");
}
