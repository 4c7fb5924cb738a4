//! Commands an operator types on the node's stdin.

pub const HELP: &str = "\
commands:
  status   print the server status
  help     print this message
  quit     stop the server and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl OperatorCommand {
    pub fn parse(line: &str) -> Self {
        let command = line.trim().to_ascii_lowercase();
        match command.as_str() {
            "" => Self::Empty,
            "status" | "s" => Self::Status,
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(line.trim().to_string()),
        }
    }
}
