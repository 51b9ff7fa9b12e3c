//! Line-oriented terminal front end.
//!
//! Plain lines are questions; lines starting with `/` are commands. The
//! front end holds only the chosen language and a cursor into the message
//! log; everything else is read back from the [`SessionController`].

use crate::config::Config;
use crate::conversation::export_file_name;
use crate::i18n::Language;
use crate::query::{RejectReason, SubmitOutcome};
use crate::session::SessionController;
use crate::types::Role;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Type a question to ask about the selected documents.

  /lang [en|vi]        toggle or set the answer language
  /docs                list attached documents and the selection
  /toggle <id>         select or deselect a document
  /upload <path>       upload a file and attach it
  /attach <id> <name>  attach an already uploaded document
  /remove <id>         hide a document from this session view
  /history             list stored conversations
  /switch <session>    continue another conversation
  /clear               clear this conversation's history
  /export              save the transcript to the export directory
  /suggest             show starter questions and quick actions
  /quick <n>           ask quick action number n
  /help                show this help
  /quit                leave";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Lang(Option<Language>),
    Docs,
    Toggle(String),
    Upload(PathBuf),
    Attach { id: String, name: String },
    Remove(String),
    History,
    Switch(String),
    Clear,
    Export,
    Suggest,
    Quick(usize),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let required = |usage: &str| {
        if arg.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(arg.to_string())
        }
    };

    match name {
        "lang" if arg.is_empty() => Ok(Command::Lang(None)),
        "lang" => arg
            .parse::<Language>()
            .map(|lang| Command::Lang(Some(lang)))
            .map_err(|e| e.to_string()),
        "docs" => Ok(Command::Docs),
        "toggle" => required("/toggle <id>").map(Command::Toggle),
        "upload" => required("/upload <path>").map(|p| Command::Upload(PathBuf::from(p))),
        "attach" => match arg.split_once(char::is_whitespace) {
            Some((id, name)) if !name.trim().is_empty() => Ok(Command::Attach {
                id: id.to_string(),
                name: name.trim().to_string(),
            }),
            _ => Err("usage: /attach <id> <name>".to_string()),
        },
        "remove" => required("/remove <id>").map(Command::Remove),
        "history" => Ok(Command::History),
        "switch" => required("/switch <session>").map(Command::Switch),
        "clear" => Ok(Command::Clear),
        "export" => Ok(Command::Export),
        "suggest" => Ok(Command::Suggest),
        "quick" => required("/quick <n>")?
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Command::Quick)
            .ok_or_else(|| "usage: /quick <n>, counting from 1".to_string()),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command /{other}, try /help")),
    }
}

struct Repl<'a> {
    controller: &'a SessionController,
    config: &'a Config,
    language: Language,
    printed: usize,
}

impl Repl<'_> {
    /// Prints turns added since the last call. User turns are echoed only
    /// when replaying a loaded history, since the user just typed the rest.
    fn print_new_messages(&mut self, echo_user: bool) {
        let messages = self.controller.messages();
        let start = self.printed.min(messages.len());
        for msg in &messages[start..] {
            match msg.role {
                Role::Assistant => println!("\n{}\n", msg.content),
                Role::User if echo_user => println!("> {}", msg.content),
                Role::User => {}
            }
        }
        self.printed = messages.len();
    }

    fn print_documents(&self) {
        let documents = self.controller.documents();
        if documents.is_empty() {
            println!("No documents attached. Use /upload <path>.");
            return;
        }
        let selected = self.controller.selected();
        for doc in documents {
            let mark = if selected.contains(&doc.document_id) { "*" } else { " " };
            println!(" {mark} {}  {}", doc.document_id, doc.document_name);
        }
    }

    async fn ask(&mut self, text: &str) {
        let outcome = self
            .controller
            .query_pipeline()
            .submit(text, self.language)
            .await;
        match outcome {
            SubmitOutcome::Rejected(RejectReason::Empty) => {}
            SubmitOutcome::Rejected(reason) => println!("not sent: {reason:?}"),
            _ => self.print_new_messages(false),
        }
    }

    /// Returns `false` when the loop should stop.
    async fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Ask(text) => self.ask(&text).await,
            Command::Lang(choice) => {
                let current = self.language;
                self.language = choice.unwrap_or_else(|| current.toggled());
                println!("language: {}", self.language);
            }
            Command::Docs => self.print_documents(),
            Command::Toggle(id) => match self.controller.toggle_document(&id) {
                Some(outcome) => println!("{id}: {outcome:?}"),
                None => println!("no document {id}"),
            },
            Command::Upload(path) => {
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        println!("cannot read {}: {err}", path.display());
                        return Ok(true);
                    }
                };
                let filename = file_name(&path);
                match self.controller.upload_document(bytes, &filename).await {
                    Ok(receipt) => {
                        println!("attached {} ({})", filename, receipt.document_id);
                        if !receipt.message.is_empty() {
                            println!("{}", receipt.message);
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
            Command::Attach { id, name } => {
                match self.controller.attach_document(&id, &name).await {
                    Ok(()) => println!("attached {name}"),
                    Err(err) => println!("{err}"),
                }
            }
            Command::Remove(id) => {
                if !self.controller.remove_document(&id) {
                    println!("no document {id}");
                }
            }
            Command::History => match self.controller.list_histories().await {
                Ok(histories) if histories.is_empty() => println!("No stored conversations."),
                Ok(histories) => {
                    for item in histories {
                        println!(
                            "{}  {} messages  {} documents  {}",
                            item.session_id,
                            item.message_count,
                            item.document_ids.len(),
                            item.updated_at.unwrap_or_default()
                        );
                    }
                }
                Err(err) => println!("{err}"),
            },
            Command::Switch(session_id) => match self.controller.switch_to(&session_id).await {
                Ok(()) => {
                    self.printed = 0;
                    println!("now in session {session_id}");
                    self.print_new_messages(true);
                }
                Err(err) => println!("{err}"),
            },
            Command::Clear => match self.controller.clear_history().await {
                Ok(()) => {
                    self.printed = 0;
                    println!("history cleared");
                }
                Err(err) => println!("{err}"),
            },
            Command::Export => {
                if let Err(err) = self.export().await {
                    println!("{err:#}");
                }
            }
            Command::Suggest => {
                let pipeline = self.controller.query_pipeline();
                for question in pipeline.suggested_questions(self.language) {
                    println!("  {question}");
                }
                for (n, action) in pipeline.quick_actions(self.language).iter().enumerate() {
                    println!("  /quick {}  {}", n + 1, action.label);
                }
            }
            Command::Quick(n) => {
                let pipeline = self.controller.query_pipeline();
                match pipeline.quick_actions(self.language).get(n - 1) {
                    Some(action) => {
                        println!("> {}", action.query);
                        self.ask(action.query).await;
                    }
                    None => println!("no quick action {n}, see /suggest"),
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    async fn export(&self) -> Result<()> {
        let Some(transcript) = self.controller.export_transcript() else {
            println!("nothing to export");
            return Ok(());
        };
        let session_id = self.controller.session_id().unwrap_or_default();
        let path = self
            .config
            .export_dir
            .join(export_file_name(&session_id, OffsetDateTime::now_utc()));
        tokio::fs::write(&path, transcript)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        println!("saved {}", path.display());
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads commands from stdin until `/quit` or end of input.
pub async fn run(controller: &SessionController, config: &Config) -> Result<()> {
    let mut repl = Repl {
        controller,
        config,
        language: config.language,
        printed: 0,
    };

    if let Some(session_id) = controller.session_id() {
        println!("session {session_id} ({}). /help for commands.", repl.language);
    }
    repl.print_documents();
    repl.print_new_messages(true);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(command) => {
                if !repl.handle(command).await? {
                    break;
                }
            }
            Err(message) => println!("{message}"),
        }
    }
    Ok(())
}
