use super::{builder, controller};
use reconnector::{ReconnectController, Status};
use reconnector_tests::{settle, EventLog, FlakyConnector};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn start_connects_and_reports_attempts() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    log.wait_for(Status::Connected).await;

    assert_eq!(log.statuses(), vec![Status::Connecting, Status::Connected]);
    let connected = &log.events()[1];
    assert_eq!(connected.attempts, Some(1));
    assert_eq!(connected.success_count, Some(1));
    assert_eq!(connected.connection, Some(0));
    assert_eq!(controller.status(), Status::Connected);
}

#[tokio::test(start_paused = true)]
async fn start_while_connecting_is_ignored() {
    let connector = FlakyConnector::new(0).with_latency(Duration::from_millis(50));
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    settle().await;
    controller.start();
    controller.start();
    log.wait_for(Status::Connected).await;
    settle().await;

    assert_eq!(log.statuses(), vec![Status::Connecting, Status::Connected]);
    assert_eq!(connector.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn start_while_connecting_keeps_session_progress() {
    let connector = FlakyConnector::new(2);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    log.wait_for_len(2).await; // connecting, error
    controller.start();
    log.wait_for(Status::Connected).await;

    let events = log.events();
    assert_eq!(
        log.statuses(),
        vec![
            Status::Connecting,
            Status::Error,
            Status::Error,
            Status::Connected
        ]
    );
    // The redundant start() did not restart the attempt count or the session.
    assert_eq!(events[3].attempts, Some(3));
    let session_start = events[0].session_start.unwrap();
    assert_eq!(events[1].session_start, Some(session_start));
    assert_eq!(events[2].session_start, Some(session_start));
    assert!(events[2].at - events[0].at >= Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn failed_session_keeps_one_session_start() {
    let connector = FlakyConnector::always_failing();
    let log = EventLog::new();
    let controller =
        ReconnectController::new(builder(&connector, &log).max_attempts(3).build().unwrap())
            .unwrap();

    controller.start();
    log.wait_for(Status::Idle).await;

    let events = log.events();
    assert_eq!(
        log.statuses(),
        vec![
            Status::Connecting,
            Status::Error,
            Status::Error,
            Status::Error,
            Status::Failed,
            Status::Idle
        ]
    );
    let session_start = events[0].session_start.unwrap();
    for event in &events[1..5] {
        assert_eq!(event.session_start, Some(session_start));
    }
    // Backoff waited 10ms then 20ms while the session start held still.
    assert!(events[4].at - events[0].at >= Duration::from_millis(30));
    assert_eq!(events[5].previous, Some(Status::Failed));
}

#[tokio::test(start_paused = true)]
async fn start_while_connected_is_ignored() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    log.wait_for(Status::Connected).await;
    controller.start();
    settle().await;

    assert_eq!(log.statuses(), vec![Status::Connecting, Status::Connected]);
    assert_eq!(connector.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_while_connected_settles_to_idle() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    log.wait_for(Status::Connected).await;
    controller.stop();
    log.wait_for(Status::Idle).await;

    let events = log.events();
    assert_eq!(
        log.statuses(),
        vec![
            Status::Connecting,
            Status::Connected,
            Status::Stopped,
            Status::Idle
        ]
    );
    assert_eq!(events[2].previous, Some(Status::Connected));
    assert_eq!(events[3].previous, Some(Status::Connected));
    assert_eq!(controller.status(), Status::Idle);
}

#[tokio::test(start_paused = true)]
async fn stop_while_idle_renotifies() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.stop();
    controller.stop();
    log.wait_for_len(4).await;

    assert_eq!(
        log.statuses(),
        vec![Status::Stopped, Status::Idle, Status::Stopped, Status::Idle]
    );
    let events = log.events();
    assert_eq!(events[0].previous, Some(Status::Idle));
    assert_eq!(events[1].previous, Some(Status::Idle));
    assert_eq!(connector.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_while_idle_is_noop() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.disconnect();
    settle().await;

    assert!(log.is_empty());
    assert_eq!(controller.status(), Status::Idle);
    assert_eq!(connector.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_while_connected_starts_new_session() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    log.wait_for(Status::Connected).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    controller.disconnect();
    log.wait_for_len(5).await;

    let events = log.events();
    assert_eq!(
        log.statuses(),
        vec![
            Status::Connecting,
            Status::Connected,
            Status::Disconnected,
            Status::Connecting,
            Status::Connected
        ]
    );
    assert_eq!(events[4].attempts, Some(1));
    assert_eq!(events[4].connection, Some(1));
    let first = events[0].session_start.unwrap();
    let second = events[3].session_start.unwrap();
    assert!(second.duration_since(first) >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn stop_while_connecting_reports_interrupted_status() {
    let connector = FlakyConnector::always_failing();
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    log.wait_for(Status::Error).await;
    controller.stop();
    log.wait_for(Status::Idle).await;

    let events = log.events();
    assert_eq!(
        log.statuses(),
        vec![
            Status::Connecting,
            Status::Error,
            Status::Stopped,
            Status::Idle
        ]
    );
    assert_eq!(events[2].previous, Some(Status::Connecting));
    assert_eq!(events[3].previous, Some(Status::Connecting));
}

#[tokio::test(start_paused = true)]
async fn success_count_accumulates_until_stop() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    log.wait_for_len(2).await;
    controller.disconnect();
    log.wait_for_len(5).await;
    controller.disconnect();
    log.wait_for_len(8).await;

    let counts: Vec<u64> = log
        .events()
        .iter()
        .filter_map(|e| e.success_count)
        .collect();
    assert_eq!(counts, vec![1, 2, 3]);

    controller.stop();
    log.wait_for(Status::Idle).await;
    log.clear();

    controller.start();
    log.wait_for(Status::Connected).await;
    assert_eq!(log.events()[1].success_count, Some(1));
}

#[tokio::test(start_paused = true)]
async fn success_count_survives_failed_session() {
    let connector = FlakyConnector::new(0);
    let log = EventLog::new();
    let controller =
        ReconnectController::new(builder(&connector, &log).max_attempts(2).build().unwrap())
            .unwrap();

    controller.start();
    log.wait_for(Status::Connected).await;

    connector.fail_next(2);
    controller.disconnect();
    log.wait_for(Status::Idle).await;
    assert_eq!(controller.status(), Status::Idle);

    log.clear();
    controller.start();
    log.wait_for(Status::Connected).await;

    assert_eq!(log.statuses(), vec![Status::Connecting, Status::Connected]);
    assert_eq!(log.events()[1].success_count, Some(2));
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_abandons_pending_attempt() {
    let connector = FlakyConnector::new(0).with_latency(Duration::from_secs(1));
    let log = EventLog::new();
    let controller = controller(&connector, &log);

    controller.start();
    settle().await;
    drop(controller);

    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;

    assert_eq!(log.statuses(), vec![Status::Connecting]);
    assert_eq!(connector.calls(), 1);
}
