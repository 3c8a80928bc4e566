//! Accumulated run output, owned by the presentation layer.
//!
//! The log only grows: events are appended in arrival order and lines are
//! removed solely by an explicit `clear`. Alongside the raw entries it keeps a
//! display view split into lines, folded in as entries arrive: process chunks
//! flow into each other, notices always occupy whole lines.

use crate::engine::classify;
use crate::model::{InfoEvent, LogChannel, RunEvent};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub channel: LogChannel,
    pub text: String,
}

/// Run of text on one display line, in a single channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub channel: LogChannel,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    lines: Vec<OutputLine>,
    bytes: usize,
    display: Vec<Vec<Segment>>,
    /// The last display line still takes stream text.
    open: bool,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, channel: LogChannel, text: impl Into<String>) {
        let text = text.into();
        self.bytes += text.len();
        self.fold_display(channel, &text);
        self.lines.push(OutputLine { channel, text });
    }

    fn fold_display(&mut self, channel: LogChannel, text: &str) {
        let streamed = matches!(channel, LogChannel::Stdout | LogChannel::Stderr);
        if !streamed {
            self.open = false;
        }
        let text = text.replace('\r', "");
        let mut parts = text.split('\n').peekable();
        while let Some(part) = parts.next() {
            let last = parts.peek().is_none();
            if !part.is_empty() {
                if !self.open {
                    self.display.push(Vec::new());
                    self.open = true;
                }
                if let Some(line) = self.display.last_mut() {
                    line.push(Segment {
                        channel,
                        text: part.to_string(),
                    });
                }
            }
            if last && (streamed || part.is_empty()) {
                break;
            }
            // End of a line: close it, or emit an empty one.
            if self.open {
                self.open = false;
            } else {
                self.display.push(Vec::new());
            }
        }
    }

    /// Fold one event into the log.
    ///
    /// A `Running` notice starts a fresh log for the new run.
    pub fn apply(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Started { .. } => {}
            RunEvent::Output { channel, text } => self.push((*channel).into(), text.as_str()),
            RunEvent::Completed(completion) => {
                let report = classify(completion.code);
                self.push(report.class.channel(), report.summary_line());
            }
            RunEvent::Failed { message } => {
                self.push(LogChannel::Error, format!("Error: {message}"))
            }
            RunEvent::Info(info) => {
                if matches!(info, InfoEvent::Running { .. }) {
                    self.clear();
                }
                self.push(info.channel(), info.to_message());
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.bytes = 0;
        self.display.clear();
        self.open = false;
    }

    /// Display lines, one `Vec<Segment>` per line; empty for blank lines.
    pub fn display_lines(&self) -> &[Vec<Segment>] {
        &self.display
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total text held, in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    /// The text the user saw: stream chunks joined as-is, notices on their own lines.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::with_capacity(self.bytes);
        for (i, line) in self.display.iter().enumerate() {
            for seg in line {
                out.push_str(&seg.text);
            }
            if i + 1 < self.display.len() || !self.open {
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Completion, StreamChannel};

    #[test]
    fn output_chunks_keep_their_channel() {
        let mut log = OutputLog::new();
        log.apply(&RunEvent::Output {
            channel: StreamChannel::Stdout,
            text: "partial li".into(),
        });
        log.apply(&RunEvent::Output {
            channel: StreamChannel::Stderr,
            text: "ne\n".into(),
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.lines()[0].channel, LogChannel::Stdout);
        assert_eq!(log.lines()[1].channel, LogChannel::Stderr);
        assert_eq!(log.byte_len(), "partial line\n".len());
    }

    #[test]
    fn completion_line_uses_classified_channel() {
        let mut log = OutputLog::new();
        log.apply(&RunEvent::Completed(Completion::from_code(1, Some(5))));
        log.apply(&RunEvent::Completed(Completion::from_code(2, Some(0))));
        log.apply(&RunEvent::Completed(Completion::from_code(3, Some(99))));
        let channels: Vec<LogChannel> = log.lines().iter().map(|l| l.channel).collect();
        assert_eq!(
            channels,
            vec![LogChannel::Warning, LogChannel::Success, LogChannel::Info]
        );
        assert!(log.lines()[2].text.contains("99"));
    }

    #[test]
    fn failures_and_notices_are_never_dropped() {
        let mut log = OutputLog::new();
        log.apply(&RunEvent::Failed {
            message: "No such file or directory".into(),
        });
        log.apply(&RunEvent::Info(InfoEvent::AlreadyRunning));
        log.apply(&RunEvent::Info(InfoEvent::Cancelled));
        assert_eq!(log.lines()[0].channel, LogChannel::Error);
        assert_eq!(log.lines()[0].text, "Error: No such file or directory");
        assert_eq!(log.lines()[1].channel, LogChannel::Warning);
        assert!(log.lines()[2].text.contains("cancelled by user"));
    }

    #[test]
    fn running_notice_starts_a_fresh_log() {
        let mut log = OutputLog::new();
        log.push(LogChannel::Stdout, "old run");
        log.apply(&RunEvent::Info(InfoEvent::Running {
            command: "robocopy \"a\" \"b\" /L".into(),
        }));
        assert_eq!(log.len(), 1);
        assert_eq!(log.lines()[0].text, "> Running: robocopy \"a\" \"b\" /L\n");
    }

    #[test]
    fn log_is_not_truncated() {
        let mut log = OutputLog::new();
        for i in 0..50_000 {
            log.push(LogChannel::Stdout, format!("{i}\n"));
        }
        assert_eq!(log.len(), 50_000);
        assert_eq!(log.lines()[0].text, "0\n");
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.byte_len(), 0);
    }

    #[test]
    fn plain_text_terminates_lines() {
        let mut log = OutputLog::new();
        log.push(LogChannel::Info, "banner");
        log.push(LogChannel::Stdout, "body\n");
        assert_eq!(log.to_plain_text(), "banner\nbody\n");
    }

    fn plain(log: &OutputLog) -> Vec<String> {
        log.display_lines()
            .iter()
            .map(|l| l.iter().map(|s| s.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn chunks_split_mid_line_are_rejoined() {
        let mut log = OutputLog::new();
        log.push(LogChannel::Stdout, "New File  4");
        log.push(LogChannel::Stdout, "2 a.txt\nNext");
        log.push(LogChannel::Stdout, " line\r\n");
        assert_eq!(plain(&log), vec!["New File  42 a.txt", "Next line"]);
        assert_eq!(log.to_plain_text(), "New File  42 a.txt\nNext line\n");
    }

    #[test]
    fn unterminated_stream_text_is_exported_unchanged() {
        let mut log = OutputLog::new();
        log.push(LogChannel::Stdout, "New File  4");
        log.push(LogChannel::Stdout, "2 a.txt\n");
        log.push(LogChannel::Stderr, "still copy");
        assert_eq!(log.to_plain_text(), "New File  42 a.txt\nstill copy");
    }

    #[test]
    fn notices_take_whole_lines() {
        let mut log = OutputLog::new();
        log.push(LogChannel::Info, "> Running: robocopy\n");
        log.push(LogChannel::Stdout, "partial");
        log.push(LogChannel::Success, "\n--- Finished with code 1: ok ---\n");
        log.push(LogChannel::Error, "Error: boom");
        assert_eq!(
            plain(&log),
            vec![
                "> Running: robocopy",
                "partial",
                "",
                "--- Finished with code 1: ok ---",
                "Error: boom"
            ]
        );
        assert_eq!(
            log.to_plain_text(),
            "> Running: robocopy\npartial\n\n--- Finished with code 1: ok ---\nError: boom\n"
        );
        let last = &log.display_lines()[4];
        assert_eq!(last[0].channel, LogChannel::Error);
    }

    #[test]
    fn clear_resets_display() {
        let mut log = OutputLog::new();
        log.push(LogChannel::Stdout, "dangling");
        log.clear();
        log.push(LogChannel::Stdout, "fresh\n");
        assert_eq!(plain(&log), vec!["fresh"]);
    }
}
