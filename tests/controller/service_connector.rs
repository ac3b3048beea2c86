use reconnector::{ReconnectConfig, ReconnectController, ServiceConnector, Status, StatusEvent};
use reconnector_tests::Refused;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower::service_fn;

#[tokio::test(start_paused = true)]
async fn tower_service_connects_after_one_refusal() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let targets: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen_targets = Arc::clone(&targets);

    let service = service_fn(move |target: String| {
        let call = counter.fetch_add(1, Ordering::SeqCst);
        seen_targets.lock().unwrap().push(target.clone());
        async move {
            if call == 0 {
                Err(Refused { call })
            } else {
                Ok(format!("{target}#{call}"))
            }
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connector = ServiceConnector::new(service, "db:5432".to_string());
    assert_eq!(connector.target(), "db:5432");

    let controller = ReconnectController::new(
        ReconnectConfig::builder()
            .connector(connector)
            .name("db")
            .delays_ms([50])
            .on_status(move |status, event: StatusEvent<String, Refused>| {
                let _ = tx.send((status, event.into_connection()));
            })
            .build()
            .unwrap(),
    )
    .unwrap();

    controller.start();

    assert_eq!(rx.recv().await, Some((Status::Connecting, None)));
    assert_eq!(rx.recv().await, Some((Status::Error, None)));
    assert_eq!(
        rx.recv().await,
        Some((Status::Connected, Some("db:5432#1".to_string())))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*targets.lock().unwrap(), vec!["db:5432", "db:5432"]);
}

#[tokio::test(start_paused = true)]
async fn tower_service_errors_reach_error_callbacks() {
    let service = service_fn(|_: ()| async { Err::<(), _>(Refused { call: 7 }) });
    let errors: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&errors);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let controller = ReconnectController::new(
        ReconnectConfig::builder()
            .connector(ServiceConnector::new(service, ()))
            .max_attempts(2)
            .delays_ms([10])
            .on_error(move |error, _, _| sink.lock().unwrap().push(error.to_string()))
            .on_status(move |status, _| {
                let _ = tx.send(status);
            })
            .build()
            .unwrap(),
    )
    .unwrap();

    controller.start();
    while let Some(status) = rx.recv().await {
        if status == Status::Idle {
            break;
        }
    }

    assert_eq!(
        *errors.lock().unwrap(),
        vec![
            "connection attempt 1 failed: connection refused (call 7)",
            "connection attempt 2 failed: connection refused (call 7)",
        ]
    );
}
