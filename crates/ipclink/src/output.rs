use std::io::IsTerminal;

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Humans get text, pipes get JSON.
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    reply: &'a str,
}

#[derive(Serialize)]
struct ResultOutput {
    result: i32,
}

/// Print a message-layer reply string.
pub fn print_reply(reply: &str, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{reply}"),
        OutputFormat::Json => print_json(&ReplyOutput { reply }),
    }
}

/// Print an RPC result value.
pub fn print_result(result: i32, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{result}"),
        OutputFormat::Json => print_json(&ResultOutput { result }),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_serializes_as_object() {
        let json = serde_json::to_string(&ReplyOutput { reply: "hi" }).unwrap();
        assert_eq!(json, r#"{"reply":"hi"}"#);
    }

    #[test]
    fn result_serializes_as_object() {
        let json = serde_json::to_string(&ResultOutput { result: -7 }).unwrap();
        assert_eq!(json, r#"{"result":-7}"#);
    }
}
