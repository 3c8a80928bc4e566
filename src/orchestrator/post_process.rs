//! Pre-run checks and post-run processing.
//!
//! Validates a configuration before it reaches the supervisor and turns a
//! finished run into its report and the process exit status for headless modes.

use crate::command;
use crate::engine::{classify, ExitReport};
use crate::model::{Completion, InfoEvent, JobConfiguration};

/// Argument vector and display string for an accepted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreparedRun {
    pub args: Vec<String>,
    pub preview: String,
}

/// Refuse configurations without both paths; otherwise build the command.
pub(crate) fn prepare_run(
    program: &str,
    config: &JobConfiguration,
) -> Result<PreparedRun, InfoEvent> {
    if config.source_path.trim().is_empty() || config.destination_path.trim().is_empty() {
        return Err(InfoEvent::MissingPaths);
    }
    Ok(PreparedRun {
        args: command::build(config),
        preview: command::preview(program, config),
    })
}

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub report: ExitReport,
    /// Status the headless CLI exits with.
    pub exit_status: i32,
}

/// Classify a completed run and log it.
pub(crate) fn process_run_completion(completion: &Completion) -> ProcessedRun {
    let report = classify(completion.code);
    tracing::info!(
        run_id = completion.run_id,
        code = ?completion.code,
        class = ?report.class,
        "{}",
        report.message
    );
    ProcessedRun {
        // A signal-terminated run has no code of its own; report it as fatal.
        exit_status: completion.code.unwrap_or(16),
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExitClass;

    #[test]
    fn missing_paths_are_refused() {
        let mut cfg = JobConfiguration::default();
        assert_eq!(prepare_run("robocopy", &cfg), Err(InfoEvent::MissingPaths));
        cfg.source_path = "C:\\src".into();
        assert_eq!(prepare_run("robocopy", &cfg), Err(InfoEvent::MissingPaths));
        cfg.destination_path = "   ".into();
        assert_eq!(prepare_run("robocopy", &cfg), Err(InfoEvent::MissingPaths));
    }

    #[test]
    fn prepared_run_carries_raw_args_and_quoted_preview() {
        let cfg = JobConfiguration {
            source_path: "C:\\My Docs".into(),
            destination_path: "D:\\Backup".into(),
            ..Default::default()
        };
        let run = prepare_run("robocopy", &cfg).unwrap();
        assert_eq!(run.args, vec!["C:\\My Docs", "D:\\Backup", "/L"]);
        assert_eq!(run.preview, "robocopy \"C:\\My Docs\" \"D:\\Backup\" /L");
    }

    #[test]
    fn completion_maps_to_report_and_status() {
        let processed = process_run_completion(&Completion::from_code(1, Some(6)));
        assert_eq!(processed.report.class, ExitClass::Warning);
        assert_eq!(processed.exit_status, 6);

        let killed = process_run_completion(&Completion::from_code(2, None));
        assert_eq!(killed.report.class, ExitClass::Info);
        assert_eq!(killed.exit_status, 16);
    }
}
