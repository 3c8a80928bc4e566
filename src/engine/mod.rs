//! Execution supervisor.
//!
//! Owns at most one child process of the copy tool, streams its output to
//! subscribers and reports how it ended. Each supervisor instance is
//! independent; callers share one by reference.

mod exit_code;
mod stream;

pub use exit_code::{classify, ExitClass, ExitReport};
pub use stream::Subscription;

use crate::model::{Completion, RunEvent, StreamChannel};
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use stream::Subscribers;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("a copy job is already running")]
    AlreadyRunning,
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("run task ended without reporting completion")]
    Interrupted,
}

/// Handle of the process currently owned by the supervisor.
struct ActiveRun {
    id: u64,
    pid: Option<u32>,
    kill_tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct RunSlot {
    active: Option<ActiveRun>,
    next_id: u64,
}

pub struct ExecutionSupervisor {
    program: String,
    slot: Arc<Mutex<RunSlot>>,
    subscribers: Subscribers,
}

impl ExecutionSupervisor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            slot: Arc::new(Mutex::new(RunSlot::default())),
            subscribers: Subscribers::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Register for run events. Drop the subscription to unsubscribe.
    pub fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.slot).active.is_some()
    }

    /// Spawn the executable with `args`. Must be called inside a Tokio runtime.
    ///
    /// Fails with `AlreadyRunning` (and no side effects) while a run is active.
    /// A launch failure is also broadcast as `RunEvent::Failed`.
    pub fn start(&self, args: Vec<String>) -> Result<PendingRun, SupervisorError> {
        let mut slot = lock(&self.slot);
        if slot.active.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                drop(slot);
                tracing::warn!(program = %self.program, error = %source, "spawn failed");
                self.subscribers.emit(RunEvent::Failed {
                    message: source.to_string(),
                });
                return Err(SupervisorError::Spawn {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        slot.next_id += 1;
        let run_id = slot.next_id;
        let (kill_tx, kill_rx) = oneshot::channel();
        slot.active = Some(ActiveRun {
            id: run_id,
            pid: child.id(),
            kill_tx,
        });
        drop(slot);

        tracing::info!(
            run_id,
            program = %self.program,
            args = args.len(),
            pid = ?child.id(),
            "run started"
        );
        self.subscribers.emit(RunEvent::Started {
            run_id,
            program: self.program.clone(),
            args,
            started_at: now_rfc3339(),
        });

        let handle = tokio::spawn(drive(
            child,
            run_id,
            kill_rx,
            self.slot.clone(),
            self.subscribers.clone(),
        ));
        Ok(PendingRun { run_id, handle })
    }

    /// Ask the running process to terminate. Does not wait for it to exit;
    /// output already in flight may still be delivered afterwards.
    pub fn cancel(&self) -> bool {
        let Some(run) = lock(&self.slot).active.take() else {
            return false;
        };
        tracing::info!(run_id = run.id, pid = ?run.pid, "run cancelled");
        // The receiver is gone only if the run already finished.
        let _ = run.kill_tx.send(());
        true
    }
}

/// Resolves with the run's completion once the process has closed.
pub struct PendingRun {
    run_id: u64,
    handle: JoinHandle<Completion>,
}

impl PendingRun {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }
}

impl Future for PendingRun {
    type Output = Result<Completion, SupervisorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|res| res.map_err(|_| SupervisorError::Interrupted))
    }
}

fn lock(slot: &Mutex<RunSlot>) -> MutexGuard<'_, RunSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Own the child until it closes: pump both pipes, honour a kill request,
/// then release the slot and broadcast the completion.
async fn drive(
    mut child: Child,
    run_id: u64,
    kill_rx: oneshot::Receiver<()>,
    slot: Arc<Mutex<RunSlot>>,
    subscribers: Subscribers,
) -> Completion {
    let stdout_task = child.stdout.take().map(|pipe| {
        tokio::spawn(stream::pump(pipe, StreamChannel::Stdout, subscribers.clone()))
    });
    let stderr_task = child.stderr.take().map(|pipe| {
        tokio::spawn(stream::pump(pipe, StreamChannel::Stderr, subscribers.clone()))
    });

    let exited = tokio::select! {
        status = child.wait() => Some(status),
        Ok(()) = kill_rx => None,
    };
    let status = match exited {
        Some(status) => status,
        None => {
            if let Err(e) = child.start_kill() {
                tracing::warn!(run_id, error = %e, "failed to signal child");
            }
            child.wait().await
        }
    };

    // Close is reported only after both pipes are drained.
    for task in [stdout_task, stderr_task].into_iter().flatten() {
        let _ = task.await;
    }

    {
        let mut slot = lock(&slot);
        if slot.active.as_ref().is_some_and(|r| r.id == run_id) {
            slot.active = None;
        }
    }

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(run_id, error = %e, "failed to wait for child");
            None
        }
    };
    let completion = Completion::from_code(run_id, code);
    tracing::info!(run_id, ?code, success = completion.success, "run finished");
    subscribers.emit(RunEvent::Completed(completion));
    completion
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    async fn collect_until_done(sub: &mut Subscription) -> Vec<RunEvent> {
        let mut events = Vec::new();
        loop {
            let ev = timeout(Duration::from_secs(10), sub.recv())
                .await
                .expect("timed out waiting for events")
                .expect("supervisor dropped");
            let done = matches!(ev, RunEvent::Completed(_) | RunEvent::Failed { .. });
            events.push(ev);
            if done {
                return events;
            }
        }
    }

    fn stdout_text(events: &[RunEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Output {
                    channel: StreamChannel::Stdout,
                    text,
                } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn streams_output_and_reports_completion() {
        let sup = ExecutionSupervisor::new("sh");
        let mut sub = sup.subscribe();
        let pending = sup.start(sh("echo hello; echo oops 1>&2; exit 3")).unwrap();
        let completion = pending.await.unwrap();
        assert_eq!(completion.code, Some(3));
        assert!(completion.success);
        assert!(!sup.is_running());

        let events = collect_until_done(&mut sub).await;
        assert!(matches!(events.first(), Some(RunEvent::Started { .. })));
        assert_eq!(stdout_text(&events), "hello\n");
        assert!(events.iter().any(|e| matches!(
            e,
            RunEvent::Output { channel: StreamChannel::Stderr, text } if text.contains("oops")
        )));
        assert_eq!(events.last(), Some(&RunEvent::Completed(completion)));
    }

    #[tokio::test]
    async fn failure_codes_are_not_success() {
        let sup = ExecutionSupervisor::new("sh");
        let completion = sup.start(sh("exit 16")).unwrap().await.unwrap();
        assert_eq!(completion.code, Some(16));
        assert!(!completion.success);
        assert_eq!(classify(completion.code).class, ExitClass::Error);
    }

    #[tokio::test]
    async fn second_start_is_rejected_without_touching_the_first() {
        let sup = ExecutionSupervisor::new("sleep");
        let mut sub = sup.subscribe();
        let first = sup.start(vec!["5".into()]).unwrap();
        let started = sub.recv().await;
        assert!(matches!(started, Some(RunEvent::Started { .. })));

        let second = sup.start(vec!["5".into()]);
        assert!(matches!(second, Err(SupervisorError::AlreadyRunning)));
        assert!(sup.is_running());
        // No second Started event was emitted.
        assert_eq!(sub.try_recv(), None);

        assert!(sup.cancel());
        let completion = timeout(Duration::from_secs(10), first)
            .await
            .expect("killed run did not finish")
            .unwrap();
        assert_eq!(completion.code, None);
        assert!(!completion.success);
    }

    #[tokio::test]
    async fn cancel_releases_the_slot_immediately() {
        let sup = ExecutionSupervisor::new("sleep");
        assert!(!sup.cancel());
        assert!(!sup.is_running());

        let pending = sup.start(vec!["5".into()]).unwrap();
        assert!(sup.is_running());
        assert!(sup.cancel());
        assert!(!sup.is_running());
        assert!(!sup.cancel());
        let _ = timeout(Duration::from_secs(10), pending).await;
    }

    #[tokio::test]
    async fn a_cancelled_run_does_not_clear_its_successor() {
        let sup = ExecutionSupervisor::new("sleep");
        let first = sup.start(vec!["5".into()]).unwrap();
        assert!(sup.cancel());
        let second = sup.start(vec!["5".into()]).unwrap();
        assert_ne!(first.run_id(), second.run_id());

        let _ = timeout(Duration::from_secs(10), first).await;
        assert!(sup.is_running());
        assert!(sup.cancel());
        let _ = timeout(Duration::from_secs(10), second).await;
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_and_recoverable() {
        let sup = ExecutionSupervisor::new("/nonexistent/robocopy-binary");
        let mut sub = sup.subscribe();
        let err = sup.start(vec![]).err().expect("spawn should fail");
        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert!(!sup.is_running());
        assert!(matches!(sub.try_recv(), Some(RunEvent::Failed { .. })));
        // The slot is free for another attempt.
        assert!(matches!(
            sup.start(vec![]),
            Err(SupervisorError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn supervisors_are_independent() {
        let a = ExecutionSupervisor::new("sleep");
        let b = ExecutionSupervisor::new("sh");
        let pa = a.start(vec!["5".into()]).unwrap();
        let pb = b.start(sh("exit 0")).unwrap();
        assert_eq!(pb.await.unwrap().code, Some(0));
        assert!(a.is_running());
        assert!(a.cancel());
        let _ = timeout(Duration::from_secs(10), pa).await;
    }
}
