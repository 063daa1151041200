//! CLI commands
//!
//! Special commands that can be executed in the REPL. Anything else is a
//! question for the agent.

use crate::agent::Agent;
use crate::core::Config;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Process as a question
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub fn handle_command(input: &str, agent: &Agent, config: &Config) -> CommandResult {
    let input = input.trim();
    if input.is_empty() {
        return CommandResult::None;
    }

    match input.to_lowercase().as_str() {
        "bye" | "exit" | "quit" | "/bye" | "/exit" | "/quit" => CommandResult::Exit,
        "/help" | "/?" => CommandResult::Handled(help_text()),
        "/status" => CommandResult::Handled(status_text(agent, config)),
        other if other.starts_with('/') => CommandResult::Handled(format!(
            "Unknown command: {}. Type /help for available commands.",
            input
        )),
        _ => CommandResult::Continue(input.to_string()),
    }
}

fn status_text(agent: &Agent, config: &Config) -> String {
    let budget = match config.agent.max_calls {
        0 => "unlimited".to_string(),
        n => format!("{} calls per question", n),
    };
    let capabilities = agent
        .declarations()
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "B3 Status:\n\
         ─────────────────────────────\n\
         Agent:        {} ({})\n\
         Expert model: {}\n\
         Dispatch:     {}\n\
         Budget:       {}\n\
         Documents:    {}\n\
         Capabilities: {}",
        agent.name(),
        agent.model(),
        config.models.expert,
        agent.dispatch_mode(),
        budget,
        config.store.root.display(),
        capabilities
    )
}

fn help_text() -> String {
    r#"B3 Commands:
─────────────────────────────
  /help        Show this help
  /status      Show models, dispatch mode and capabilities
  bye, exit    Leave B3 (Ctrl+D works as well)

Anything else is a question for B3. Press Ctrl+C to cancel a question
that is taking too long.

Examples:
  list my files
  what is the expiration date of my passport?
  how do I renew my identity card?"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Agent {
        Agent::builder("B3", "test").model("m").build().unwrap()
    }

    #[test]
    fn test_exit_commands() {
        let config = Config::default();
        for input in ["bye", "exit", " BYE ", "/quit"] {
            assert_eq!(handle_command(input, &agent(), &config), CommandResult::Exit);
        }
    }

    #[test]
    fn test_questions_pass_through() {
        let config = Config::default();
        assert_eq!(
            handle_command("  help me renew my passport ", &agent(), &config),
            CommandResult::Continue("help me renew my passport".to_string())
        );
        assert_eq!(handle_command("   ", &agent(), &config), CommandResult::None);
    }

    #[test]
    fn test_status_and_unknown() {
        let config = Config::default();
        match handle_command("/status", &agent(), &config) {
            CommandResult::Handled(text) => assert!(text.contains("Dispatch:")),
            other => panic!("unexpected {:?}", other),
        }
        match handle_command("/frobnicate", &agent(), &config) {
            CommandResult::Handled(text) => assert!(text.starts_with("Unknown command")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
