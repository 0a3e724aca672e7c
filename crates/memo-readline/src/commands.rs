//! Command parsing for the notes prompt.

/// Every command word, in the order `help` lists them.
pub const COMMAND_NAMES: &[&str] = &[
    "list", "new", "edit", "cancel", "title", "content", "save", "delete", "refresh", "logout",
    "help", "quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    New,
    /// 1-based position in the last printed list.
    Edit(usize),
    Cancel,
    Title(String),
    Content(String),
    Save,
    Delete(usize),
    Refresh,
    Logout,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Text arguments are kept exactly as typed after the
    /// separating space.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim_start();
        let (word, rest) = match line.split_once(' ') {
            Some((word, rest)) => (word, rest),
            None => (line.trim_end(), ""),
        };

        let command = match word {
            "list" | "ls" => Self::List,
            "new" => Self::New,
            "edit" => Self::Edit(position(rest)?),
            "cancel" => Self::Cancel,
            "title" => Self::Title(rest.to_string()),
            "content" => Self::Content(rest.to_string()),
            "save" => Self::Save,
            "delete" | "rm" => Self::Delete(position(rest)?),
            "refresh" => Self::Refresh,
            "logout" => Self::Logout,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("Unknown command: {other}")),
        };
        Ok(command)
    }
}

fn position(arg: &str) -> Result<usize, String> {
    let arg = arg.trim();
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ if arg.is_empty() => Err("Expected a note number".to_string()),
        _ => Err(format!("Not a note number: {arg}")),
    }
}

pub const HELP: &str = "\
list              show your notes, newest first
new               start a new note (drops the current draft)
edit <n>          load note <n> into the form
cancel            stop editing and clear the form
title <text>      set the draft title
content <text>    set the draft content
save              create or update from the form
delete <n>        delete note <n> after confirming
refresh           reload notes from the server
logout            sign out
quit              exit";
