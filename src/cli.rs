#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io::Write;

use clap::{Args, CommandFactory, Parser, Subcommand};
use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::backend::ArcBackend;
use crate::config::{self, Configuration, load_configuration, lookup_config_path};
use crate::models::Conversation;
use crate::session::{CompletionOutcome, Session};

#[derive(Debug, Parser)]
#[command(
    version,
    about,
    long_about = r#"Manage conversations with an Ollama-compatible completion API

Default configuration file location looks up in the following order:
    * $XDG_CONFIG_HOME/parley/config.toml
    * $HOME/.config/parley/config.toml
    * $HOME/.parley.toml
"#,
    disable_version_flag = true
)]
pub struct Command {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Show the version
    #[arg(short, long)]
    version: bool,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Action {
    /// Send prompts and stream the replies. Reads one prompt per line from
    /// stdin when no prompt is given.
    Chat(ChatArgs),
    /// List stored conversations
    List,
    /// Print a conversation
    Show { id: String },
    /// Rename a conversation
    Rename { id: String, title: String },
    /// Delete a conversation
    Delete { id: String },
    /// Delete every conversation
    Clear,
    /// List the models the backend serves
    Models,
}

#[derive(Debug, Args, PartialEq, Default)]
pub struct ChatArgs {
    /// Model to generate with; falls back to `general.default_model`
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt for the conversation
    #[arg(short, long)]
    pub system: Option<String>,

    /// Sampling temperature for the conversation
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Seed for the conversation, left out of requests when not an integer
    #[arg(long)]
    pub seed: Option<String>,

    /// Continue an existing conversation instead of starting a new one
    #[arg(short, long, value_name = "ID")]
    pub conversation: Option<String>,

    pub prompt: Vec<String>,
}

impl Command {
    pub fn new() -> Command {
        Self::parse()
    }

    pub fn get_config(&self) -> Result<Configuration> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| lookup_config_path().unwrap_or_default());

        if config_path.is_empty() {
            // No config path is specified just use the default config
            return Ok(Configuration::default());
        }
        Ok(load_configuration(config_path.as_str()).wrap_err("loading configuration")?)
    }

    pub fn version(&self) -> bool {
        self.version
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn print_version(&self) {
        println!("{}", config::version())
    }

    pub fn print_help() -> Result<()> {
        Self::command().print_help().wrap_err("printing help")?;
        Ok(())
    }
}

/// Run everything but `chat`, which needs the event printer set up by main.
pub async fn execute(
    action: &Action,
    session: &Session,
    backend: &ArcBackend,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    match action {
        Action::Chat(_) => eyre::bail!("chat is run by the interactive loop"),
        Action::List => {
            for convo in session.conversations() {
                writeln!(out, "{}", summary_line(&convo))?;
            }
        }
        Action::Show { id } => {
            let convo = session
                .get(id)
                .ok_or_else(|| eyre::eyre!("conversation {} not found", id))?;
            write_conversation(out, &convo)?;
        }
        Action::Rename { id, title } => {
            session.rename(id, title).wrap_err("renaming conversation")?;
        }
        Action::Delete { id } => {
            session.delete(id).wrap_err("deleting conversation")?;
        }
        Action::Clear => session.clear(),
        Action::Models => {
            let models = backend.list_models().await.wrap_err("listing models")?;
            for model in models {
                writeln!(out, "{}", model)?;
            }
        }
    }
    Ok(())
}

/// Submit every prompt of a chat in order. Returns how many replies failed.
pub async fn chat(
    args: &ChatArgs,
    session: &Session,
    default_model: Option<&str>,
) -> Result<usize> {
    let model = args
        .model
        .as_deref()
        .or(default_model)
        .ok_or_else(|| eyre::eyre!("No model specified, pass --model or set general.default_model"))?
        .to_string();

    match args.conversation.as_deref() {
        Some(id) => session.select(id).wrap_err("selecting conversation")?,
        None => {
            // A fresh conversation starts from the configured settings.
            let initial = session.settings();
            session.new_conversation();
            session.set_system(initial.system);
            session.set_temperature(initial.temperature);
            session.set_seed(initial.seed);
        }
    }

    if let Some(system) = args.system.as_deref() {
        session.set_system(system);
    }
    if let Some(temperature) = args.temperature {
        session.set_temperature(temperature);
    }
    if let Some(seed) = args.seed.as_deref() {
        session.set_seed(seed);
    }

    let mut failures = 0;
    if !args.prompt.is_empty() {
        session.set_input(args.prompt.join(" "));
        if submit(session, &model).await == CompletionOutcome::Failed {
            failures += 1;
        }
        return Ok(failures);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.wrap_err("reading prompt")? {
        session.set_input(line);
        if submit(session, &model).await == CompletionOutcome::Failed {
            failures += 1;
        }
    }
    Ok(failures)
}

async fn submit(session: &Session, model: &str) -> CompletionOutcome {
    let outcome = session.submit_input(model).await;
    log::debug!("Submission finished: {:?}", outcome);
    outcome
}

pub(crate) fn summary_line(convo: &Conversation) -> String {
    format!(
        "{}  {}  {} ({} messages)",
        convo.id(),
        convo
            .updated_at()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M"),
        convo.title(),
        convo.len()
    )
}

pub(crate) fn write_conversation(out: &mut (dyn Write + Send), convo: &Conversation) -> Result<()> {
    writeln!(out, "# {}", convo.title())?;
    if !convo.system().is_empty() {
        writeln!(out, "system: {}", convo.system())?;
    }
    write!(out, "temperature: {}", convo.temperature())?;
    if !convo.seed().is_empty() {
        write!(out, ", seed: {}", convo.seed())?;
    }
    writeln!(out)?;

    for message in convo.messages() {
        writeln!(out)?;
        writeln!(out, "[{}] {}", message.creator(), message.content())?;
    }
    Ok(())
}
