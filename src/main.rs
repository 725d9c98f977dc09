// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cortado - café assistant chat engine
//!
//! Entry point for the demo CLI: an interactive REPL against the configured
//! provider (offline by default) and a one-shot ask mode.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cortado::assistant::{ChatAssistant, OrchestrationMode};
use cortado::config::Settings;
use cortado::llm::http::{HttpProvider, HttpProviderConfig};
use cortado::llm::registry::ProviderRegistry;
use cortado::profile::UserContext;
use cortado::ui::AiResponse;

#[derive(Parser)]
#[command(name = "cortado", version, about = "Café assistant chat engine")]
struct Cli {
    /// Increase log verbosity (engine diagnostics)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the bounded tool-calling loop instead of the linear pipeline
    #[arg(long)]
    tool_loop: bool,

    /// User id to chat as
    #[arg(long, default_value = "guest")]
    user: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat,
    /// Ask a single question and print the response
    Ask {
        /// The question text
        text: String,
    },
    /// List the registered functions
    Functions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // Practical debug toggle: `-v` enables engine diagnostics without
    // requiring users to know target names. `RUST_LOG` still takes
    // precedence.
    if cli.verbose > 0 {
        for directive in [
            "cortado.pipeline=debug",
            "cortado.strategy=debug",
            "cortado.loop=debug",
            "cortado.functions=debug",
        ] {
            if let Ok(parsed) = directive.parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = Settings::load().context("loading settings")?;
    let mut assistant = build_assistant(&settings, cli.tool_loop).await?;
    let user = UserContext::new(cli.user);

    match cli.command {
        None | Some(Commands::Chat) => run_chat(&mut assistant, &user).await,
        Some(Commands::Ask { text }) => {
            let response = assistant.send_message(&text, &user).await;
            print_response(&response);
            Ok(())
        }
        Some(Commands::Functions) => {
            for spec in assistant.catalog().list_for_model() {
                println!("{:32} {}", spec.name, spec.description);
            }
            Ok(())
        }
    }
}

async fn build_assistant(settings: &Settings, tool_loop: bool) -> Result<ChatAssistant> {
    let mut registry = ProviderRegistry::new();
    if let Some(http) = &settings.providers.http {
        let api_key = std::env::var(&http.api_key_env).ok();
        registry.register_as(
            "http",
            Arc::new(HttpProvider::new(HttpProviderConfig {
                base_url: http.base_url.clone(),
                api_key,
                model: http.model.clone(),
            })),
        );
    }

    let mode = if tool_loop {
        OrchestrationMode::ToolLoop
    } else {
        OrchestrationMode::Pipeline
    };

    let mut builder = ChatAssistant::builder()
        .registry(registry)
        .provider(&settings.providers.default)
        .mode(mode)
        .business(settings.business_profile())
        .allow_list(settings.functions.allow_list.clone());
    for (name, url) in &settings.functions.endpoints {
        builder = builder.endpoint(name, url);
    }
    let mut assistant = builder.build();

    if let Some(url) = &settings.functions.manifest_url {
        match assistant.load_remote_functions(url).await {
            Ok(added) => eprintln!("Loaded {} remote functions", added),
            Err(e) => eprintln!("Could not load remote functions: {}", e),
        }
    }

    Ok(assistant)
}

async fn run_chat(assistant: &mut ChatAssistant, user: &UserContext) -> Result<()> {
    println!("Cortado chat ({} provider). Type /help for commands.", assistant.provider_name());

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("/reset    clear the conversation");
                println!("/history  show the conversation so far");
                println!("/quit     leave");
                continue;
            }
            "/reset" => {
                assistant.reset().await;
                println!("Conversation cleared.");
                continue;
            }
            "/history" => {
                for message in assistant.history().await {
                    println!("{}: {}", message.role, message.content);
                }
                continue;
            }
            _ => {}
        }

        let response = assistant.send_message(input, user).await;
        print_response(&response);
    }

    Ok(())
}

fn print_response(response: &AiResponse) {
    println!("{}", response.message.content);

    if !response.ui_components.is_empty() {
        println!("  [{} component(s)]", response.ui_components.len());
    }
    if !response.suggested_prompts.is_empty() {
        println!("  Try: {}", response.suggested_prompts.join(" | "));
    }
}
