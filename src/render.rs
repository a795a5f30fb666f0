//! One output line per event.

use minutewatch_sdk::PollError;
use minutewatch_types::{MinuteEvent, Position};
use serde::Serialize;

/// Output style selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Something worth printing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Line {
    /// Position read at startup.
    Seed(Position),
    Minute(MinuteEvent),
    Height { height: u64 },
    CommittedHeight { committed_height: u64 },
    Error { message: String },
}

impl Line {
    pub fn error(err: &PollError) -> Self {
        Line::Error {
            message: err.to_string(),
        }
    }
}

pub fn render(line: &Line, format: Format) -> serde_json::Result<String> {
    match format {
        Format::Json => serde_json::to_string(line),
        Format::Text => Ok(text(line)),
    }
}

fn text(line: &Line) -> String {
    match line {
        Line::Seed(p) => format!(
            "seed       height={} committed={} minute={}",
            p.height, p.committed_height, p.minute
        ),
        Line::Minute(e) => format!(
            "minute     height={} committed={} minute={}",
            e.height, e.committed_height, e.minute
        ),
        Line::Height { height } => format!("height     {height}"),
        Line::CommittedHeight { committed_height } => format!("committed  {committed_height}"),
        Line::Error { message } => format!("error      {message}"),
    }
}

#[cfg(test)]
mod tests {
    use minutewatch_sdk::RpcError;
    use std::time::Duration;

    use super::*;

    #[test]
    fn text_lines() {
        let seed = Line::Seed(Position::new(10, 9, 0));
        assert_eq!(
            render(&seed, Format::Text).unwrap(),
            "seed       height=10 committed=9 minute=0"
        );
        assert_eq!(
            render(&Line::Height { height: 11 }, Format::Text).unwrap(),
            "height     11"
        );
    }

    #[test]
    fn json_minute_is_tagged() {
        let line = Line::Minute(MinuteEvent {
            committed_height: 10,
            height: 10,
            minute: 6,
        });
        let value: serde_json::Value =
            serde_json::from_str(&render(&line, Format::Json).unwrap()).unwrap();

        assert_eq!(value["event"], "minute");
        assert_eq!(value["height"], 10);
        assert_eq!(value["minute"], 6);
    }

    #[test]
    fn json_committed_height() {
        let line = Line::CommittedHeight {
            committed_height: 42,
        };
        assert_eq!(
            render(&line, Format::Json).unwrap(),
            r#"{"event":"committed_height","committed_height":42}"#
        );
    }

    #[test]
    fn errors_carry_their_message() {
        let line = Line::error(&PollError::Deadline(Duration::from_secs(5)));
        let Line::Error { message } = &line else {
            panic!("expected an error line");
        };
        assert!(message.contains("5s"));

        let line = Line::error(&PollError::Rpc(RpcError::Timeout));
        assert!(render(&line, Format::Text).unwrap().starts_with("error "));
    }
}
