//! Terminal command parsing.

use thiserror::Error;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ACCESS <type> <id>`
    Access { f_type: String, f_id: i64 },
    Help,
    Clear,
    Logout,
    /// Blank line.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type HELP for a list of commands.")]
    Unknown(String),

    #[error("Usage: ACCESS <type> <id>")]
    Usage,

    #[error("File id must be a positive whole number, got '{0}'")]
    BadId(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  ACCESS <type> <id>   Request a file (types: SCP, MTF, SITE, USER)
  HELP                 Show this list
  CLEAR | CLS          Clear the screen
  LOGOUT               End the session";

impl Command {
    /// Keywords are case-insensitive. The file type is upper-cased before
    /// it is sent.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(Command::Empty);
        };

        match keyword.to_ascii_uppercase().as_str() {
            "ACCESS" => {
                let (Some(f_type), Some(id), None) = (words.next(), words.next(), words.next())
                else {
                    return Err(CommandError::Usage);
                };
                let f_id = id
                    .parse::<i64>()
                    .ok()
                    .filter(|f_id| *f_id > 0)
                    .ok_or_else(|| CommandError::BadId(id.to_string()))?;
                Ok(Command::Access {
                    f_type: f_type.to_ascii_uppercase(),
                    f_id,
                })
            }
            "HELP" => Ok(Command::Help),
            "CLEAR" | "CLS" => Ok(Command::Clear),
            "LOGOUT" | "EXIT" | "QUIT" => Ok(Command::Logout),
            _ => Err(CommandError::Unknown(keyword.to_string())),
        }
    }
}
