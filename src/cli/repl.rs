//! Interactive REPL for B3
//!
//! Provides the main user interaction loop.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{presets, Agent, CallContext, ConversationLogger};
use crate::cli::commands::{handle_command, CommandResult};
use crate::cli::printer::TerminalLogger;
use crate::core::{B3Error, Config, Part, Result};
use crate::llm::ModelClient;
use crate::store::{DocumentStore, Folder};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    agent: Agent,
    client: Arc<dyn ModelClient>,
    store: Arc<dyn DocumentStore>,
    logger: Arc<dyn ConversationLogger>,
}

impl Repl {
    /// Create a REPL around the B3 agent
    pub fn new(
        config: Config,
        client: Arc<dyn ModelClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let mut agent = presets::b3_agent(&config, Arc::clone(&store))?;
        agent.set_text_sink(Arc::new(|text: &str| println!("{}", text)));

        Ok(Self {
            config,
            agent,
            client,
            store,
            logger: Arc::new(TerminalLogger::new()),
        })
    }

    /// Run the REPL, answering `inputs` first as if they had been typed
    pub async fn run(&mut self, inputs: Vec<String>) -> Result<()> {
        self.print_banner();
        self.scan_folders().await?;

        self.agent
            .start(
                &CallContext::new(),
                Arc::clone(&self.client),
                Arc::clone(&self.logger),
            )
            .await?;

        println!("Welcome! I am B3, ready to assist you with your documents.");
        println!("Type 'bye' or press Ctrl+D to exit.");

        let mut inputs = VecDeque::from(inputs);
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("> ");
            stdout.flush()?;

            let input = match inputs.pop_front() {
                Some(input) => {
                    let input = input.trim().to_string();
                    if input.is_empty() {
                        continue;
                    }
                    println!("{}", input);
                    input
                }
                None => {
                    let mut line = String::new();
                    match stdin.lock().read_line(&mut line) {
                        Ok(0) => {
                            // EOF (Ctrl+D)
                            println!();
                            break;
                        }
                        Ok(_) => line,
                        Err(e) => {
                            eprintln!("Error reading input: {}", e);
                            continue;
                        }
                    }
                }
            };

            match handle_command(&input, &self.agent, &self.config) {
                CommandResult::Exit => break,
                CommandResult::Handled(output) => println!("{}\n", output),
                CommandResult::None => continue,
                CommandResult::Continue(question) => self.ask(&question).await,
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Ask one question; Ctrl+C cancels it
    async fn ask(&mut self, question: &str) {
        let token = CancellationToken::new();
        let ctx = CallContext::new()
            .with_cancel(token.clone())
            .with_budget(self.config.agent.max_calls);

        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
        let result = self.agent.ask(&ctx, vec![Part::text(question)]).await;
        watcher.abort();

        debug!(calls = ctx.budget().used(), "question finished");

        match result {
            Ok(content) => {
                let answer = content.text();
                if answer.is_empty() {
                    println!("(B3 had nothing to say)");
                } else {
                    println!("{}", answer);
                }
                for part in &content.parts {
                    if !matches!(part, Part::Text(_)) {
                        println!("unhandled part type: {:?}", part);
                    }
                }
            }
            Err(B3Error::Cancelled) => println!("\nQuestion cancelled."),
            Err(e) => eprintln!("\nError: {}\n", e),
        }
    }

    /// Check both folders are reachable before talking to the model
    async fn scan_folders(&self) -> Result<()> {
        let archive = self.store.folder_name(Folder::Archive);
        let workspace = self.store.folder_name(Folder::Workspace);
        eprintln!(
            "B3 is getting ready, scanning {} and {} folders...",
            archive, workspace
        );

        for folder in [Folder::Archive, Folder::Workspace] {
            let files = self.store.list(folder).await?;
            eprintln!(
                "  {}: {} file(s)",
                self.store.folder_name(folder),
                files.len()
            );
        }
        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!(
            r#"
 ____  _____
| __ )|___ /
|  _ \  |_ \
| |_) |___) |
|____/|____/   The Bureaucratic Barriers Buster
"#
        );
        println!("Documents:  {}", self.config.store.root.display());
        println!("Models:");
        println!("  Assistant: {}", self.config.models.primary);
        println!("  Experts:   {}", self.config.models.expert);
        println!();
        println!("Commands: /help, /status, bye");
        println!("─────────────────────────────────────────────────────────");
    }
}
