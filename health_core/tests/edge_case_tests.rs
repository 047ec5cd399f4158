use health_core::{
    error_status, probe, status_of_result, with_status, Metadata, Monitor, MonitorEvent,
    SelfHealthy, SelfStatus, StatusError, StatusLevel, SubsystemSpec,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
enum StorageError {
    #[error("disk nearly full")]
    NearlyFull,
    #[error("disk unavailable")]
    Unavailable,
}

impl SelfStatus for StorageError {
    fn status(&self) -> StatusLevel {
        match self {
            StorageError::NearlyFull => StatusLevel::Warn,
            StorageError::Unavailable => StatusLevel::Bad,
        }
    }
}

#[derive(Debug, Error)]
#[error("sync failed")]
struct SyncError {
    #[source]
    source: StatusError,
}

#[derive(Debug, Error)]
#[error("mirror out of sync")]
struct MirrorLagging {
    caught_up: bool,
}

impl SelfHealthy for MirrorLagging {
    fn is_healthy(&self) -> bool {
        self.caught_up
    }
}

#[test]
fn test_self_status_errors_reach_the_monitor() {
    let monitor = Monitor::builder()
        .subsystem(SubsystemSpec::new("storage"))
        .build()
        .unwrap();
    let updater = monitor.updater("storage").unwrap();

    let result: Result<(), StorageError> = Err(StorageError::NearlyFull);
    assert_eq!(status_of_result(&result), StatusLevel::Warn);

    updater.report_status(result);
    let state = monitor.state();
    let storage = state.subsystem("storage").unwrap();
    assert_eq!(storage.status, StatusLevel::Warn);
    assert_eq!(storage.last_error.as_ref().unwrap().to_string(), "disk nearly full");
    assert_eq!(state.status, StatusLevel::Warn);

    updater.report_status(Err(StorageError::Unavailable));
    assert_eq!(monitor.state().status, StatusLevel::Bad);

    updater.report_status::<StorageError>(Ok(()));
    let state = monitor.state();
    assert_eq!(state.status, StatusLevel::Good);
    assert!(state.subsystem("storage").unwrap().last_error.is_none());
}

#[test]
fn test_self_healthy_errors_reach_the_monitor() {
    let monitor = Monitor::builder()
        .subsystem(SubsystemSpec::new("mirror"))
        .build()
        .unwrap();
    let updater = monitor.updater("mirror").unwrap();

    updater.report_status(Err(MirrorLagging { caught_up: false }));
    assert_eq!(monitor.state().status, StatusLevel::Bad);

    updater.report_status(Err(MirrorLagging { caught_up: true }));
    let state = monitor.state();
    assert_eq!(state.status, StatusLevel::Good);
    assert_eq!(
        state.subsystem("mirror").unwrap().last_error.as_ref().unwrap().to_string(),
        "mirror out of sync"
    );
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_checks_use_declared_status() {
    let monitor = Monitor::builder()
        .subsystem(
            SubsystemSpec::new("storage")
                .with_probe(probe::from_self_status_result(|| Err(StorageError::NearlyFull)))
                .with_probe_interval(Duration::from_secs(5)),
        )
        .subsystem(
            SubsystemSpec::new("mirror")
                .non_critical()
                .with_probe(probe::from_self_status_result(|| {
                    Err(MirrorLagging { caught_up: false })
                }))
                .with_probe_interval(Duration::from_secs(5)),
        )
        .build()
        .unwrap();

    monitor.start().unwrap();
    tokio::time::sleep(Duration::from_millis(5001)).await;

    let state = monitor.state();
    assert_eq!(state.subsystem("storage").unwrap().status, StatusLevel::Warn);
    assert_eq!(state.subsystem("mirror").unwrap().status, StatusLevel::Bad);
    assert_eq!(state.status, StatusLevel::Warn);

    monitor.shutdown().unwrap();
}

#[test]
fn test_wrapped_status_is_found_in_source_chain() {
    let err = SyncError {
        source: with_status(StorageError::Unavailable, StatusLevel::Warn),
    };
    assert_eq!(error_status(Some(&err as &(dyn std::error::Error + 'static))), StatusLevel::Warn);

    let monitor = Monitor::builder()
        .subsystem(SubsystemSpec::new("sync").non_critical())
        .build()
        .unwrap();
    monitor.updater("sync").unwrap().report(Err(err));

    let state = monitor.state();
    assert_eq!(state.subsystem("sync").unwrap().status, StatusLevel::Warn);
    assert_eq!(state.status, StatusLevel::Warn);
}

#[test]
fn test_rewrapping_replaces_status() {
    let err = with_status(with_status(StorageError::NearlyFull, StatusLevel::Bad), StatusLevel::Good);
    assert_eq!(err.status(), StatusLevel::Good);
    assert_eq!(err.to_string(), "disk nearly full");
}

#[test]
fn test_metadata_is_serialized_with_snapshots() {
    let monitor = Monitor::builder()
        .subsystem(
            SubsystemSpec::new("queue").with_metadata(Metadata::from_pairs([
                serde_json::json!("broker"),
                serde_json::json!("amqp://queue:5672"),
                serde_json::json!("partitions"),
                serde_json::json!(12),
                serde_json::json!("dangling"),
            ])),
        )
        .build()
        .unwrap();

    let json = serde_json::to_value(&*monitor.state()).unwrap();
    let metadata = &json["subsystems"][0]["metadata"];
    assert_eq!(metadata["broker"], "amqp://queue:5672");
    assert_eq!(metadata["partitions"], 12);
    assert!(metadata["dangling"].is_null());
    assert!(metadata.as_object().unwrap().contains_key("dangling"));
}

#[test]
fn test_listener_can_retain_event_copies() {
    let retained = Arc::new(Mutex::new(Vec::new()));
    let listener = {
        let retained = Arc::clone(&retained);
        move |event: &MonitorEvent<'_>| retained.lock().push(event.to_subsystems())
    };

    let monitor = Monitor::builder()
        .subsystem(SubsystemSpec::new("a"))
        .listener(listener)
        .build()
        .unwrap();
    let updater = monitor.updater("a").unwrap();
    updater.update(StatusLevel::Warn, None);
    updater.update(StatusLevel::Bad, None);

    let statuses: Vec<StatusLevel> = retained.lock().iter().map(|s| s[0].status).collect();
    assert_eq!(
        statuses,
        vec![StatusLevel::Good, StatusLevel::Warn, StatusLevel::Bad]
    );
}

#[test]
fn test_empty_monitor() {
    let monitor = Monitor::builder().build().unwrap();
    assert!(monitor.is_empty());
    assert_eq!(monitor.state().status, StatusLevel::Good);

    // no probes, so no runtime is needed
    monitor.start().unwrap();
    monitor.shutdown().unwrap();
}
