//! Exit-code classification for robocopy.
//!
//! robocopy's exit status is a bit field: 1 = files copied, 2 = extra files,
//! 4 = mismatches, 8 = copy failures, 16 = fatal error.

use crate::model::LogChannel;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitClass {
    Success,
    Warning,
    Error,
    /// Code not in the table, or no code at all.
    Info,
}

impl ExitClass {
    pub fn channel(self) -> LogChannel {
        match self {
            ExitClass::Success => LogChannel::Success,
            ExitClass::Warning => LogChannel::Warning,
            ExitClass::Error => LogChannel::Error,
            ExitClass::Info => LogChannel::Info,
        }
    }
}

const FAILURES: &str = "Some files or directories could not be copied";

static EXIT_CODES: &[(i32, ExitClass, &str)] = &[
    (
        0,
        ExitClass::Success,
        "No files were copied; source and destination are in sync",
    ),
    (1, ExitClass::Success, "All files were copied successfully"),
    (
        2,
        ExitClass::Success,
        "Extra files were found at the destination; no files were copied",
    ),
    (
        3,
        ExitClass::Success,
        "Files were copied and extra files were found at the destination",
    ),
    (
        4,
        ExitClass::Warning,
        "Mismatched files or directories were detected",
    ),
    (
        5,
        ExitClass::Warning,
        "Files were copied and mismatched files were detected",
    ),
    (
        6,
        ExitClass::Warning,
        "Extra and mismatched files were detected; no files were copied",
    ),
    (
        7,
        ExitClass::Warning,
        "Files were copied; extra and mismatched files were detected",
    ),
    (8, ExitClass::Error, FAILURES),
    (9, ExitClass::Error, FAILURES),
    (10, ExitClass::Error, FAILURES),
    (11, ExitClass::Error, FAILURES),
    (12, ExitClass::Error, FAILURES),
    (13, ExitClass::Error, FAILURES),
    (14, ExitClass::Error, FAILURES),
    (15, ExitClass::Error, FAILURES),
    (
        16,
        ExitClass::Error,
        "Fatal error: no files were copied (check paths and permissions)",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub class: ExitClass,
    pub message: String,
}

impl ExitReport {
    /// Completion line appended to the output log.
    pub fn summary_line(&self) -> String {
        let code = self
            .code
            .map_or_else(|| "none".to_string(), |c| c.to_string());
        format!("\n--- Finished with code {code}: {} ---\n", self.message)
    }
}

/// Map a process exit code to its class and message.
pub fn classify(code: Option<i32>) -> ExitReport {
    let known = code.and_then(|c| EXIT_CODES.iter().find(|(k, _, _)| *k == c));
    match (code, known) {
        (_, Some((_, class, message))) => ExitReport {
            code,
            class: *class,
            message: (*message).to_string(),
        },
        (Some(c), None) => ExitReport {
            code,
            class: ExitClass::Info,
            message: format!("Exit code: {c}"),
        },
        (None, None) => ExitReport {
            code,
            class: ExitClass::Info,
            message: "Process ended without an exit code".to_string(),
        },
    }
}
