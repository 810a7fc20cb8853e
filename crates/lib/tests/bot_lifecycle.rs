//! Lifecycle controller and worker loop against a stub connector.

mod common;

use common::{
    message, pipeline, settings, wait_until, Sent, StubCapturer, StubConnector, StubModel,
    StubOptions,
};
use lib::bot::{
    BotController, BotState, LifecycleError, StopOutcome, PROGRESS_MESSAGE, REPORT_BUTTON,
    WELCOME_MESSAGE,
};
use lib::channels::{ChatClient, ParseMode, ReplyKeyboard};
use std::sync::Arc;
use std::time::Duration;

const STOP_TIMEOUT: Duration = Duration::from_secs(2);

fn controller(options: StubOptions) -> (BotController, Arc<StubConnector>) {
    let connector = Arc::new(StubConnector::new(options));
    let p = pipeline(
        settings(Some("key"), Some("Summarize the screen")),
        Arc::new(StubCapturer::returning(Some(vec![0; 10]))),
        Arc::new(StubModel::replying(&["Report: 50% done."])),
    );
    let controller = BotController::new(connector.clone(), p).with_stop_timeout(STOP_TIMEOUT);
    (controller, connector)
}

#[test]
fn start_requires_a_token() {
    let (controller, connector) = controller(StubOptions::default());
    assert!(matches!(
        controller.start("  "),
        Err(LifecycleError::MissingCredential)
    ));
    assert!(connector.events().is_empty());
    assert_eq!(controller.state(), BotState::Stopped);
}

#[test]
fn start_then_stop() {
    let (controller, _connector) = controller(StubOptions::default());
    controller.start("token-a").unwrap();
    assert!(controller.is_running());
    assert_eq!(controller.state(), BotState::Running);

    assert_eq!(controller.stop(STOP_TIMEOUT), StopOutcome::Stopped);
    assert!(!controller.is_running());
}

#[test]
fn stop_when_stopped_is_a_noop() {
    let (controller, connector) = controller(StubOptions::default());
    assert_eq!(controller.stop(STOP_TIMEOUT), StopOutcome::NotRunning);
    assert_eq!(controller.stop(STOP_TIMEOUT), StopOutcome::NotRunning);
    assert_eq!(controller.state(), BotState::Stopped);
    assert!(connector.events().is_empty());
}

#[test]
fn restart_stops_previous_session_before_connecting() {
    let (controller, connector) = controller(StubOptions::default());
    controller.start("token-a").unwrap();
    controller.start("token-b").unwrap();

    assert_eq!(
        connector.events(),
        vec![
            "connect:token-a".to_string(),
            "stop:token-a".to_string(),
            "connect:token-b".to_string(),
        ]
    );
    let clients = connector.clients();
    assert_eq!(clients.len(), 2);
    assert!(!clients[0].is_polling());
    assert!(clients[1].is_polling());
    assert!(controller.is_running());
    controller.stop(STOP_TIMEOUT);
}

#[test]
fn worker_answers_start_and_report_in_order() {
    let (controller, connector) = controller(StubOptions {
        batches: vec![vec![
            message(1, 7, "/start"),
            message(2, 8, "hello"),
            message(3, 7, REPORT_BUTTON),
        ]],
        ..StubOptions::default()
    });
    controller.start("token").unwrap();
    let client = connector.clients()[0].clone();
    assert!(wait_until(Duration::from_secs(5), || !client
        .photos()
        .is_empty()));
    controller.stop(STOP_TIMEOUT);

    let sent = client.sent();
    assert_eq!(
        sent,
        vec![
            Sent::Text {
                chat_id: 7,
                text: WELCOME_MESSAGE.to_string(),
                keyboard: Some(ReplyKeyboard::single(REPORT_BUTTON)),
            },
            Sent::Text {
                chat_id: 7,
                text: PROGRESS_MESSAGE.to_string(),
                keyboard: None,
            },
            Sent::Photo {
                chat_id: 7,
                photo: vec![0; 10],
                caption: "Report: 50% done\\.".to_string(),
                parse_mode: Some(ParseMode::MarkdownV2),
            },
        ]
    );
}

#[test]
fn fatal_poll_error_marks_bot_stopped() {
    let (controller, _connector) = controller(StubOptions {
        poll_error_status: Some(401),
        ..StubOptions::default()
    });
    controller.start("bad-token").unwrap();
    assert!(wait_until(Duration::from_secs(2), || !controller
        .is_running()));
    assert_eq!(controller.state(), BotState::Stopped);
    assert_eq!(controller.stop(STOP_TIMEOUT), StopOutcome::Stopped);
}

#[test]
fn transient_poll_error_keeps_running() {
    let (controller, _connector) = controller(StubOptions {
        poll_error_status: Some(502),
        ..StubOptions::default()
    });
    controller.start("token").unwrap();
    std::thread::sleep(Duration::from_millis(100));
    assert!(controller.is_running());
    assert_eq!(controller.stop(Duration::from_secs(4)), StopOutcome::Stopped);
}

#[test]
fn timed_out_stop_blocks_restart_until_worker_exits() {
    let (controller, _connector) = controller(StubOptions {
        poll_delay: Duration::from_millis(600),
        ..StubOptions::default()
    });
    controller.start("token").unwrap();
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(
        controller.stop(Duration::from_millis(50)),
        StopOutcome::TimedOut
    );
    assert_eq!(controller.state(), BotState::Stopped);
    assert!(matches!(
        controller.start("token"),
        Err(LifecycleError::PreviousWorkerAlive)
    ));

    assert!(wait_until(Duration::from_secs(3), || controller
        .start("token")
        .is_ok()));
    assert!(controller.is_running());
    controller.stop(STOP_TIMEOUT);
}
