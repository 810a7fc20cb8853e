//! Lifecycle controller: owns the single bot session and starts/stops its worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::bot::pipeline::ReportPipeline;
use crate::bot::worker::{spawn_worker, BotWorker, WorkerHandle};
use crate::channels::{ChannelError, ChatClient, ChatConnector};

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Running,
    Stopped,
}

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// There was no session.
    NotRunning,
    /// The worker thread exited within the timeout.
    Stopped,
    /// The worker was still busy when the timeout expired. Restart is refused until it exits.
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("telegram bot token not saved")]
    MissingCredential,
    #[error("previous bot worker is still running; try again once it has stopped")]
    PreviousWorkerAlive,
    #[error("failed to connect: {0}")]
    Connect(#[from] ChannelError),
    #[error("failed to spawn bot worker: {0}")]
    Spawn(#[from] std::io::Error),
}

struct BotSession {
    client: Arc<dyn ChatClient>,
    running: Arc<AtomicBool>,
    worker: WorkerHandle,
}

#[derive(Default)]
struct ControllerState {
    session: Option<BotSession>,
    /// Worker that did not exit within the stop timeout.
    lingering: Option<WorkerHandle>,
}

/// Starts and stops the bot. At most one session exists at a time.
pub struct BotController {
    connector: Arc<dyn ChatConnector>,
    pipeline: Arc<ReportPipeline>,
    stop_timeout: Duration,
    state: Mutex<ControllerState>,
}

impl BotController {
    pub fn new(connector: Arc<dyn ChatConnector>, pipeline: Arc<ReportPipeline>) -> Self {
        Self {
            connector,
            pipeline,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            state: Mutex::new(ControllerState::default()),
        }
    }

    /// Bound used when `start` has to stop a running session first.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    pub fn pipeline(&self) -> &Arc<ReportPipeline> {
        &self.pipeline
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect with `token` and launch the worker. A running session is stopped first.
    pub fn start(&self, token: &str) -> Result<(), LifecycleError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(LifecycleError::MissingCredential);
        }
        let mut state = self.lock();
        if let Some(session) = state.session.take() {
            log::info!("bot: restarting");
            shutdown(&mut state, session, self.stop_timeout);
        }
        if let Some(mut lingering) = state.lingering.take() {
            if !lingering.is_finished() {
                state.lingering = Some(lingering);
                return Err(LifecycleError::PreviousWorkerAlive);
            }
        }

        let client = self.connector.connect(token)?;
        let running = Arc::new(AtomicBool::new(true));
        let worker = BotWorker::new(Arc::clone(&client), Arc::clone(&self.pipeline));
        let worker = match spawn_worker(worker, Arc::clone(&running)) {
            Ok(handle) => handle,
            Err(e) => {
                client.stop_polling();
                return Err(e.into());
            }
        };
        state.session = Some(BotSession {
            client,
            running,
            worker,
        });
        log::info!("bot: started");
        Ok(())
    }

    /// Signal the worker to stop and wait up to `timeout` for its thread.
    /// The controller reports Stopped afterwards whatever the outcome.
    pub fn stop(&self, timeout: Duration) -> StopOutcome {
        let mut state = self.lock();
        match state.session.take() {
            Some(session) => shutdown(&mut state, session, timeout),
            None => StopOutcome::NotRunning,
        }
    }

    /// True while a session exists and its worker has not exited.
    pub fn is_running(&self) -> bool {
        self.lock()
            .session
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::SeqCst))
    }

    pub fn state(&self) -> BotState {
        if self.is_running() {
            BotState::Running
        } else {
            BotState::Stopped
        }
    }
}

fn shutdown(state: &mut ControllerState, mut session: BotSession, timeout: Duration) -> StopOutcome {
    session.client.stop_polling();
    if session.worker.wait(timeout) {
        log::info!("bot: stopped");
        StopOutcome::Stopped
    } else {
        log::warn!(
            "bot: worker still busy after {:?}; restart blocked until it exits",
            timeout
        );
        session.running.store(false, Ordering::SeqCst);
        state.lingering = Some(session.worker);
        StopOutcome::TimedOut
    }
}

impl Drop for BotController {
    fn drop(&mut self) {
        let timeout = self.stop_timeout;
        self.stop(timeout);
    }
}
