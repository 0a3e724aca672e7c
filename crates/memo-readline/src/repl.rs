use std::io;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::sync::mpsc::UnboundedReceiver;

use memo_application::{EditorMode, NotesScreen, Route};
use memo_core::MemoError;
use memo_core::entry::Entry;
use memo_core::notification::Notification;

use crate::backend::Backend;
use crate::commands::{Command, HELP};
use crate::helper::CliHelper;

/// Interactive notes prompt on top of a [`NotesScreen`].
pub struct Repl {
    screen: NotesScreen,
    backend: Backend,
    notifications: UnboundedReceiver<Notification>,
    rl: Editor<CliHelper, DefaultHistory>,
    /// Entries as last printed, so `edit <n>` and `delete <n>` match what the user saw.
    listed: Vec<Entry>,
}

impl Repl {
    pub fn new(
        screen: NotesScreen,
        backend: Backend,
        notifications: UnboundedReceiver<Notification>,
    ) -> Result<Self> {
        let mut rl = Editor::new()?;
        rl.set_helper(Some(CliHelper::new()));
        Ok(Self {
            screen,
            backend,
            notifications,
            rl,
            listed: Vec::new(),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}", "=== memo ===".bright_magenta().bold());
        println!("{}", "Type 'help' for commands, 'quit' to exit.".bright_black());

        if self.screen.route() == Route::Notes {
            self.show_list().await;
        }

        loop {
            // Unauthenticated access always lands on the sign-in prompt
            if self.screen.route() == Route::SignIn && !self.sign_in().await? {
                break;
            }

            let prompt = self.prompt();
            let line = match self.rl.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            };
            if line.trim().is_empty() {
                continue;
            }
            let _ = self.rl.add_history_entry(line.as_str());

            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command).await,
                Err(message) => println!("{}", message.yellow()),
            }
            self.flush_notifications();
        }

        println!("{}", "Goodbye!".bright_green());
        Ok(())
    }

    pub fn screen(&self) -> &NotesScreen {
        &self.screen
    }

    fn prompt(&self) -> String {
        match self.screen.editor().mode() {
            EditorMode::Creating => "memo> ".to_string(),
            EditorMode::Editing(entry) => format!("memo [{}]> ", entry.title),
        }
    }

    /// Returns false when the user gives up on signing in.
    async fn sign_in(&mut self) -> Result<bool> {
        println!("{}", "Sign in to continue.".bright_yellow());
        loop {
            let Some(email) = self.read_field("email: ")? else {
                return Ok(false);
            };
            let Some(password) = read_password("password: ").await? else {
                return Ok(false);
            };

            match self.backend.sign_in(email.trim(), &password).await {
                Ok(()) => {
                    self.screen.wait_for_route(Route::Notes).await;
                    let name = self
                        .screen
                        .session()
                        .map(|s| s.display_name().to_string())
                        .unwrap_or_default();
                    println!("{}", format!("Signed in as {name}").bright_green());
                    self.show_list().await;
                    return Ok(true);
                }
                Err(e) => println!("{}", format!("Sign-in failed: {e}").red()),
            }
        }
    }

    fn read_field(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.rl.readline(prompt) {
            Ok(value) => Ok(Some(value)),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::List => self.show_list().await,
            Command::New | Command::Cancel => match self.screen.cancel_edit() {
                Ok(()) => println!("{}", "New note: set title and content, then save.".bright_black()),
                Err(e) => println!("{}", e.to_string().yellow()),
            },
            Command::Edit(n) => {
                let Some(entry) = self.listed_entry(n) else {
                    return;
                };
                match self.screen.start_edit(entry) {
                    Ok(()) => self.show_form(),
                    Err(e) => println!("{}", e.to_string().yellow()),
                }
            }
            Command::Title(title) => {
                self.screen.set_title(title);
                self.show_form();
            }
            Command::Content(content) => {
                self.screen.set_content(content);
                self.show_form();
            }
            Command::Save => match self.screen.submit().await {
                Ok(()) => self.show_list().await,
                Err(e @ (MemoError::Validation { .. } | MemoError::SubmitPending)) => {
                    println!("{}", e.to_string().yellow())
                }
                // Remote failures were notified; a missing session redirects
                Err(_) => {}
            },
            Command::Delete(n) => {
                let Some(entry) = self.listed_entry(n) else {
                    return;
                };
                match self.screen.delete_entry(&entry).await {
                    Ok(true) => self.show_list().await,
                    Ok(false) => println!("{}", "Kept.".bright_black()),
                    Err(_) => {}
                }
            }
            Command::Refresh => match self.screen.refresh().await {
                Ok(entries) => self.render(entries),
                Err(e) => {
                    println!("{}", format!("Refresh failed: {e}").red());
                    let stale = self.screen.cache().list();
                    self.render(stale);
                }
            },
            Command::Logout => {
                if let Err(e) = self.screen.sign_out().await {
                    println!("{}", format!("Remote sign-out failed: {e}").red());
                }
                self.screen.wait_for_route(Route::SignIn).await;
                self.listed.clear();
                println!("{}", "Signed out.".bright_green());
            }
            Command::Help => println!("{}", HELP.bright_black()),
            Command::Quit => {}
        }
    }

    fn listed_entry(&self, n: usize) -> Option<Entry> {
        let entry = self.listed.get(n - 1).cloned();
        if entry.is_none() {
            println!("{}", format!("No note {n}. Run 'list' first.").yellow());
        }
        entry
    }

    async fn show_list(&mut self) {
        let (entries, error) = self.screen.entries().await;
        if let Some(e) = error {
            println!("{}", format!("Showing last loaded notes: {e}").yellow());
        }
        self.render(entries);
    }

    fn render(&mut self, entries: Vec<Entry>) {
        if entries.is_empty() {
            println!("{}", "No notes yet.".bright_black());
        }
        for (i, entry) in entries.iter().enumerate() {
            println!(
                "{:>3}. {}  {}",
                i + 1,
                entry.title.bold(),
                entry
                    .created_at
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
                    .bright_black()
            );
            for line in entry.content.lines() {
                println!("     {}", line.bright_blue());
            }
        }
        self.listed = entries;
    }

    fn show_form(&self) {
        let editor = self.screen.editor();
        let heading = match editor.mode() {
            EditorMode::Creating => "New note".to_string(),
            EditorMode::Editing(entry) => format!("Editing \"{}\"", entry.title),
        };
        println!("{}", heading.bright_magenta());
        println!("  title:   {}", editor.draft().title);
        println!("  content: {}", editor.draft().content);
    }

    fn flush_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            if notification.is_success() {
                println!("{}", format!("✓ {}", notification.message).green());
            } else {
                println!("{}", format!("✗ {}", notification.message).red());
            }
        }
    }
}

/// Reads a password without echoing it. End of input gives up.
async fn read_password(prompt: &'static str) -> Result<Option<String>> {
    let read = tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt)).await?;
    password_answer(read)
}

fn password_answer(read: io::Result<String>) -> Result<Option<String>> {
    match read {
        Ok(password) => Ok(Some(password)),
        Err(e) if matches!(e.kind(), io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted) => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_answer() {
        assert_eq!(
            password_answer(Ok("hunter2".to_string())).unwrap(),
            Some("hunter2".to_string())
        );
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of file");
        assert_eq!(password_answer(Err(eof)).unwrap(), None);

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no tty");
        assert!(password_answer(Err(denied)).is_err());
    }
}
