//! Run lifecycle controller.
//!
//! Owns the execution supervisor, turns UI commands into start/cancel calls and
//! forwards supervisor events to presentation layers.

use super::post_process::{prepare_run, process_run_completion};
use crate::engine::{ExecutionSupervisor, PendingRun, SupervisorError};
use crate::model::{InfoEvent, JobConfiguration, RunEvent};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;

/// Commands emitted by UI layers to control runs.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Start(Box<JobConfiguration>),
    Cancel,
    Quit,
}

/// Validate, build and start a run, reporting the outcome as events.
fn start_run(
    supervisor: &ExecutionSupervisor,
    config: &JobConfiguration,
    event_tx: &UnboundedSender<RunEvent>,
) -> Option<PendingRun> {
    let prepared = match prepare_run(supervisor.program(), config) {
        Ok(p) => p,
        Err(notice) => {
            let _ = event_tx.send(RunEvent::Info(notice));
            return None;
        }
    };
    match supervisor.start(prepared.args) {
        Ok(pending) => {
            tracing::debug!(run_id = pending.run_id(), "run accepted");
            let _ = event_tx.send(RunEvent::Info(InfoEvent::Running {
                command: prepared.preview,
            }));
            Some(pending)
        }
        Err(SupervisorError::AlreadyRunning) => {
            let _ = event_tx.send(RunEvent::Info(InfoEvent::AlreadyRunning));
            None
        }
        // Spawn failures reach the UI through the supervisor's own Failed event.
        Err(e) => {
            tracing::warn!(error = %e, "run not started");
            None
        }
    }
}

/// Orchestrate runs based on UI commands and emit events back to presentation layers.
pub(crate) async fn run_controller(
    program: String,
    event_tx: UnboundedSender<RunEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let supervisor = ExecutionSupervisor::new(program);
    let mut events = supervisor.subscribe();
    let mut pending: Option<PendingRun> = None;
    // Cancel watchdog: if a cancelled process lingers, tell the user once.
    let mut cancel_deadline: Option<tokio::time::Instant> = None;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    let res = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Start(config)) => {
                        if let Some(p) = start_run(&supervisor, &config, &event_tx) {
                            pending = Some(p);
                            cancel_deadline = None;
                        }
                    }
                    Some(UiCommand::Cancel) => {
                        if supervisor.cancel() {
                            let _ = event_tx.send(RunEvent::Info(InfoEvent::Cancelled));
                            cancel_deadline =
                                Some(tokio::time::Instant::now() + Duration::from_secs(3));
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        supervisor.cancel();
                        break Ok(());
                    }
                }
            }
            Some(ev) = events.recv() => {
                let _ = event_tx.send(ev);
            }
            // Do not take the pending run before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            done = async {
                match pending.as_mut() {
                    Some(p) => p.await,
                    None => futures::future::pending().await,
                }
            } => {
                pending = None;
                cancel_deadline = None;
                match done {
                    Ok(completion) => {
                        let _ = process_run_completion(&completion);
                    }
                    Err(e) => {
                        let _ = event_tx.send(RunEvent::Info(InfoEvent::Message {
                            text: format!("Run task failed: {e}"),
                        }));
                    }
                }
            }
            _ = watchdog.tick() => {
                if let Some(deadline) = cancel_deadline {
                    if tokio::time::Instant::now() >= deadline && pending.is_some() {
                        let _ = event_tx.send(RunEvent::Info(InfoEvent::StillCancelling));
                        cancel_deadline = None;
                    }
                }
            }
        }
    };

    res
}
