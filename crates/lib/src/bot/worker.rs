//! Bot worker: the getUpdates polling loop and its dedicated thread.

use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::bot::dispatch::{BotCommand, Dispatcher, REPORT_BUTTON};
use crate::bot::pipeline::ReportPipeline;
use crate::channels::{ChannelError, ChatClient, InboundMessage, ReplyKeyboard};

pub const WELCOME_MESSAGE: &str = "Hi! I'm ready. Press the button to generate a report.";

const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Polls one chat client and dispatches its messages.
pub struct BotWorker {
    client: Arc<dyn ChatClient>,
    pipeline: Arc<ReportPipeline>,
    dispatcher: Dispatcher,
    keyboard: ReplyKeyboard,
}

impl BotWorker {
    pub fn new(client: Arc<dyn ChatClient>, pipeline: Arc<ReportPipeline>) -> Self {
        Self {
            client,
            pipeline,
            dispatcher: Dispatcher::new(),
            keyboard: ReplyKeyboard::single(REPORT_BUTTON),
        }
    }

    /// Poll until the client stops polling. Transient errors are retried after a fixed delay;
    /// fatal ones end the loop with the error.
    pub async fn run(&self) -> Result<(), ChannelError> {
        log::info!("bot: starting getUpdates long-poll loop");
        let mut offset: Option<i64> = None;
        while self.client.is_polling() {
            match self.client.poll_updates(offset).await {
                Ok((messages, next)) => {
                    offset = next.or(offset);
                    if !messages.is_empty() {
                        self.handle_batch(messages).await;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::debug!("bot: getUpdates error: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
        log::info!("bot: getUpdates loop stopped");
        Ok(())
    }

    /// Messages of one chat run in arrival order; different chats run concurrently.
    async fn handle_batch(&self, messages: Vec<InboundMessage>) {
        let mut per_chat: Vec<(i64, Vec<InboundMessage>)> = Vec::new();
        for msg in messages {
            match per_chat.iter_mut().find(|(id, _)| *id == msg.chat_id) {
                Some((_, queue)) => queue.push(msg),
                None => per_chat.push((msg.chat_id, vec![msg])),
            }
        }
        join_all(per_chat.into_iter().map(|(_, queue)| async move {
            for msg in queue {
                self.handle_message(&msg).await;
            }
        }))
        .await;
    }

    async fn handle_message(&self, msg: &InboundMessage) {
        let Some(command) = self.dispatcher.route(&msg.text) else {
            log::debug!("bot: ignoring unrouted message in chat {}", msg.chat_id);
            return;
        };
        log::info!("bot: {:?} from chat {}", command, msg.chat_id);
        match command {
            BotCommand::Start => {
                if let Err(e) = self
                    .client
                    .send_text(msg.chat_id, WELCOME_MESSAGE, Some(&self.keyboard))
                    .await
                {
                    log::warn!("bot: welcome to chat {} failed: {}", msg.chat_id, e);
                }
            }
            BotCommand::Report => self.pipeline.run(self.client.as_ref(), msg.chat_id).await,
        }
    }
}

/// Clears the running flag and signals completion when the worker thread ends, panics included.
struct ExitGuard {
    running: Arc<AtomicBool>,
    done: Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.done.send(());
    }
}

/// Handle to a worker thread with a bounded wait.
pub struct WorkerHandle {
    thread: Option<JoinHandle<()>>,
    done: Receiver<()>,
}

impl WorkerHandle {
    /// Wait up to `timeout` for the thread to exit. Returns true once it has exited.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    if thread.join().is_err() {
                        log::warn!("bot: worker thread panicked");
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    pub fn is_finished(&mut self) -> bool {
        self.wait(Duration::ZERO)
    }
}

/// Run `worker` on its own thread with a current-thread runtime.
pub fn spawn_worker(worker: BotWorker, running: Arc<AtomicBool>) -> std::io::Result<WorkerHandle> {
    let (done_tx, done_rx) = mpsc::channel();
    let thread = std::thread::Builder::new()
        .name("bot-worker".to_string())
        .spawn(move || {
            let _guard = ExitGuard {
                running,
                done: done_tx,
            };
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::warn!("bot: failed to build runtime: {}", e);
                    return;
                }
            };
            if let Err(e) = rt.block_on(worker.run()) {
                log::warn!("bot: worker terminated: {}", e);
            }
        })?;
    Ok(WorkerHandle {
        thread: Some(thread),
        done: done_rx,
    })
}
