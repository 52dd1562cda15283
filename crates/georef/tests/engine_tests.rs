//! Tests for the engine state machine.
//!
//! Covers:
//! - Readiness and NotReady rejection
//! - Busy rejection of concurrent warps and reloads
//! - Start/finish notifications and status messages
//! - Failed loads keeping previous inputs
//! - Cancellation and asynchronous warps

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use georef::engine::SUCCESS_MESSAGE;
use georef::naming::{auto_output_path, find_gcp_for_image};
use georef::{
    Engine, EngineConfig, EngineState, ErrorKind, GeorefError, ProjectionMode, WarpEvent,
    WarpOptions,
};
use test_utils::{small_pass, TestDataset};

// ============================================================================
// Helper functions
// ============================================================================

fn ready_engine(ds: &TestDataset, dest: &str) -> Engine {
    let engine = Engine::new(EngineConfig::default());
    engine.set_source(&ds.image).unwrap();
    engine.load_gcp(&ds.gcp).unwrap();
    engine
        .set_destination(ds.path(dest).to_str().unwrap())
        .unwrap();
    engine
}

fn geographic() -> WarpOptions {
    WarpOptions::new(ProjectionMode::Geographic, false)
}

fn recorder(engine: &Engine) -> Arc<Mutex<Vec<WarpEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

#[test]
fn test_engine_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Engine>();
}

// ============================================================================
// Readiness
// ============================================================================

#[test]
fn test_missing_source_leaves_engine_unready() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = Engine::default();

    let err = engine.set_source(ds.path("missing.png")).unwrap_err();
    assert!(matches!(err, GeorefError::FileNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.source_x_size().is_none());

    engine.load_gcp(&ds.gcp).unwrap();
    engine
        .set_destination(ds.path("out.tif").to_str().unwrap())
        .unwrap();
    assert!(!engine.is_ready());

    let err = engine.warp(geographic()).unwrap_err();
    assert!(matches!(err, GeorefError::NotReady(_)));
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(!ds.path("out.tif").exists());
}

#[test]
fn test_missing_gcp_and_destination() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = Engine::default();
    engine.set_source(&ds.image).unwrap();
    assert!(matches!(
        engine.warp(geographic()),
        Err(GeorefError::NotReady(_))
    ));

    engine.load_gcp(&ds.gcp).unwrap();
    assert!(matches!(
        engine.warp(geographic()),
        Err(GeorefError::NotReady(_))
    ));

    engine
        .set_destination(ds.path("out").to_str().unwrap())
        .unwrap();
    assert!(engine.is_ready());
    assert_eq!(engine.destination(), Some(ds.path("out.tif")));
}

#[test]
fn test_unsupported_image_format() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let bogus = ds.write_text("bogus.png", "not an image");
    let engine = Engine::default();
    assert!(matches!(
        engine.set_source(&bogus),
        Err(GeorefError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_failed_reload_keeps_previous_inputs() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = ready_engine(&ds, "out.tif");
    let zone = engine.utm_zone();

    let broken = ds.write_text("broken.gcp", "2 2 10 10\n55 37\n");
    assert!(matches!(
        engine.load_gcp(&broken),
        Err(GeorefError::RecordCountMismatch { .. })
    ));
    assert!(engine.set_source(ds.path("missing.png")).is_err());

    assert_eq!(engine.gcp_x_size(), Some(4));
    assert_eq!(engine.source_x_size(), Some(120));
    assert_eq!(engine.utm_zone(), zone);
    assert!(engine.warp(geographic()).is_ok());
}

// ============================================================================
// State transitions and notifications
// ============================================================================

#[test]
fn test_successful_warp_events() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = ready_engine(&ds, "out.tif");
    let events = recorder(&engine);

    let report = engine.warp(geographic()).unwrap();
    assert_eq!(engine.state(), EngineState::Succeeded);
    assert!(report.destination.exists());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], WarpEvent::Started);
    match &events[1] {
        WarpEvent::Finished(status) => {
            assert!(status.is_success());
            assert_eq!(status.message, SUCCESS_MESSAGE);
        }
        other => panic!("expected Finished, got {:?}", other),
    }
    assert_eq!(engine.last_status().map(|s| s.state), Some(EngineState::Succeeded));
}

#[test]
fn test_panicking_subscriber_does_not_wedge_engine() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = ready_engine(&ds, "out.tif");
    engine.subscribe(|event| {
        if *event == WarpEvent::Started {
            panic!("subscriber failure");
        }
    });
    let events = recorder(&engine);

    let report = engine.warp(geographic()).unwrap();
    assert!(report.destination.exists());
    assert_eq!(engine.state(), EngineState::Succeeded);
    assert!(matches!(
        events.lock().unwrap().last(),
        Some(WarpEvent::Finished(status)) if status.is_success()
    ));

    // Inputs can be reloaded and the engine warps again
    engine.load_gcp(&ds.gcp).unwrap();
    engine.set_source(&ds.image).unwrap();
    assert!(engine.warp(geographic()).is_ok());
    assert_eq!(engine.state(), EngineState::Succeeded);
}

#[test]
fn test_write_failure_reports_failed() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = ready_engine(&ds, "no_such_dir/out.tif");
    let events = recorder(&engine);

    let err = engine.warp(geographic()).unwrap_err();
    assert!(matches!(err, GeorefError::WriteFailed(_)));
    assert_eq!(err.kind(), ErrorKind::Output);
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(!ds.path("no_such_dir/out.tif").exists());

    {
        let events = events.lock().unwrap();
        match events.last() {
            Some(WarpEvent::Finished(status)) => {
                assert_eq!(status.state, EngineState::Failed);
                assert_eq!(status.code, Some("WriteFailed"));
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    // A failed engine can warp again once the destination is fixed
    engine
        .set_destination(ds.path("out.tif").to_str().unwrap())
        .unwrap();
    assert!(engine.warp(geographic()).is_ok());
    assert_eq!(engine.state(), EngineState::Succeeded);
}

#[test]
fn test_second_warp_while_running_is_busy() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = ready_engine(&ds, "out.tif");

    // Hold the first warp inside its Started notification
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let release_rx = Mutex::new(release_rx);
    engine.subscribe(move |event| {
        if *event == WarpEvent::Started {
            let _ = started_tx.lock().unwrap().send(());
            let _ = release_rx.lock().unwrap().recv();
        }
    });

    let worker = engine.clone();
    let handle = thread::spawn(move || worker.warp(geographic()));
    started_rx
        .recv_timeout(Duration::from_secs(30))
        .expect("first warp should start");

    assert_eq!(engine.state(), EngineState::Running);
    assert!(!engine.is_ready());
    assert!(matches!(engine.warp(geographic()), Err(GeorefError::Busy)));
    assert!(matches!(engine.load_gcp(&ds.gcp), Err(GeorefError::Busy)));
    assert!(matches!(engine.set_source(&ds.image), Err(GeorefError::Busy)));
    assert!(matches!(
        engine.set_destination("elsewhere.tif"),
        Err(GeorefError::Busy)
    ));

    release_tx.send(()).unwrap();
    let report = handle.join().unwrap().unwrap();
    assert_eq!(engine.state(), EngineState::Succeeded);
    assert_eq!(report.destination, ds.path("out.tif"));
    assert!(report.destination.exists());
}

#[test]
fn test_cancel_leaves_no_output() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = ready_engine(&ds, "out.tif");

    let handle = engine.clone();
    engine.subscribe(move |event| {
        if *event == WarpEvent::Started {
            handle.cancel();
        }
    });

    let err = engine.warp(geographic()).unwrap_err();
    assert!(matches!(err, GeorefError::Cancelled));
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(!ds.path("out.tif").exists());

    // Only the fixture inputs remain in the directory
    let names: Vec<String> = std::fs::read_dir(ds.dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
}

#[tokio::test]
async fn test_warp_async() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let engine = ready_engine(&ds, "async.tif");

    let report = engine
        .warp_async(WarpOptions::new(ProjectionMode::Utm, true))
        .await
        .unwrap();
    assert_eq!(report.crs.zone_label().as_deref(), Some("37N"));
    assert_eq!(engine.state(), EngineState::Succeeded);
    assert!(ds.path("async.tif").exists());
}

// ============================================================================
// Naming helpers with a loaded engine
// ============================================================================

#[test]
fn test_auto_naming_round() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    assert_eq!(find_gcp_for_image(&ds.image), Some(ds.gcp.clone()));

    let engine = Engine::default();
    engine.set_source(&ds.image).unwrap();
    engine.load_gcp(&ds.gcp).unwrap();

    let label = engine.utm_zone_label().unwrap();
    let dest = auto_output_path(&ds.image, ProjectionMode::Utm, &label);
    assert_eq!(dest, ds.path("pass_37N.tif"));

    engine.set_destination(dest.to_str().unwrap()).unwrap();
    engine
        .warp(WarpOptions::new(ProjectionMode::Utm, false))
        .unwrap();

    // The name is taken now; the next one gets a postfix
    assert_eq!(
        auto_output_path(&ds.image, ProjectionMode::Utm, &label),
        ds.path("pass_37N_1.tif")
    );
}
