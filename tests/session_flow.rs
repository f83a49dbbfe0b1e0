//! Integration tests for server selection, single passes and continuous sessions

mod common;

use common::{candidate, test_logger, FakeFactory, FakeProvider, FakeScript, Probe};
use network_speed_monitor::{
    error::AppError,
    events::{RecordingSink, SessionEvent},
    models::TestResult,
    output::OutputCoordinator,
    provider::ProviderFactory,
    session::{ServerSelector, SessionManager, SessionTimings, SingleTestRunner},
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const PROBE_TIMEOUT: Duration = Duration::from_millis(50);

fn selector() -> ServerSelector {
    ServerSelector::new(PROBE_TIMEOUT, test_logger())
}

fn runner() -> SingleTestRunner {
    SingleTestRunner::new(
        SessionTimings {
            probe_timeout: PROBE_TIMEOUT,
            ..SessionTimings::immediate()
        },
        test_logger(),
    )
}

/// Zero pacing inside a pass, 20 s between continuous iterations
fn paced_timings() -> SessionTimings {
    SessionTimings {
        probe_timeout: Duration::from_secs(1),
        iteration_interval: Duration::from_secs(20),
        ..SessionTimings::immediate()
    }
}

fn manager(factory: &FakeFactory, timings: SessionTimings) -> SessionManager {
    SessionManager::new(Arc::new(factory.clone()), timings, test_logger())
}

fn final_results(events: &[SessionEvent]) -> Vec<&network_speed_monitor::FinalResult> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Final(result) => Some(result),
            _ => None,
        })
        .collect()
}

// --- server selection ---

#[tokio::test]
async fn preferred_server_is_used_without_probing() {
    let (mut provider, log) = FakeProvider::new(FakeScript::standard());

    let server = assert_ok!(selector().select("s", &mut provider, Some("far")).await);
    assert_eq!(server.id, "far");
    assert_eq!(log.count("probe:"), 0);
    assert_eq!(log.count("list"), 0);
    assert_eq!(log.calls(), vec!["find:far", "select:far"]);
}

#[tokio::test]
async fn lowest_latency_among_three_closest_wins() {
    let (mut provider, log) = FakeProvider::new(FakeScript::standard());

    let server = selector().select("s", &mut provider, None).await.unwrap();
    assert_eq!(server.id, "mid");
    assert_eq!(server.latency, Some(10.0));

    let calls = log.calls();
    assert!(calls.contains(&"probe:near".to_string()));
    assert!(calls.contains(&"probe:edge".to_string()));
    // Fourth-closest is never probed even though it would be fastest
    assert!(!calls.contains(&"probe:far".to_string()));
    assert_eq!(log.count("best"), 0);
}

#[tokio::test]
async fn latency_ties_keep_distance_order() {
    let script = FakeScript::standard()
        .probe("near", Probe::Latency(Duration::from_millis(10)))
        .probe("mid", Probe::Latency(Duration::from_millis(10)));
    let (mut provider, _log) = FakeProvider::new(script);

    let server = selector().select("s", &mut provider, None).await.unwrap();
    assert_eq!(server.id, "near");
}

#[tokio::test]
async fn unreachable_candidates_fall_back_to_best_server() {
    let script = FakeScript::standard()
        .probe("near", Probe::Fail)
        .probe("mid", Probe::Hang)
        .probe("edge", Probe::Fail);
    let (mut provider, log) = FakeProvider::new(script);

    let server = selector().select("s", &mut provider, None).await.unwrap();
    assert_eq!(server.id, "far");
    assert_eq!(log.count("best"), 1);
    assert_eq!(log.count("select:"), 0);
}

#[tokio::test]
async fn no_reachable_server_and_no_fallback_is_a_resolution_error() {
    let mut script = FakeScript::standard()
        .probe("near", Probe::Fail)
        .probe("mid", Probe::Fail)
        .probe("edge", Probe::Fail);
    script.best = None;
    let (mut provider, _log) = FakeProvider::new(script);

    let err = assert_err!(selector().select("s", &mut provider, None).await);
    assert!(matches!(err, AppError::ServerResolution(_)));
    assert!(err.to_string().contains("No reachable server"));
}

#[tokio::test]
async fn candidate_list_failure_propagates() {
    let mut script = FakeScript::standard();
    script.fail_listing = true;
    let (mut provider, log) = FakeProvider::new(script);

    assert!(selector().select("s", &mut provider, None).await.is_err());
    assert_eq!(log.count("best"), 0);
}

// --- single pass ---

fn expected_single_pass_types() -> Vec<&'static str> {
    let mut expected = vec!["status", "client_info", "status", "server_selected", "status"];
    expected.extend(std::iter::repeat("ping_sample").take(5));
    expected.push("status");
    expected.extend(std::iter::repeat("download_progress").take(20));
    expected.push("download_complete");
    expected.push("status");
    expected.extend(std::iter::repeat("upload_progress").take(20));
    expected.push("upload_complete");
    expected.push("final");
    expected
}

#[tokio::test]
async fn single_pass_emits_events_in_order() {
    let (mut provider, _log) = FakeProvider::new(FakeScript::standard());
    let sink = RecordingSink::new();

    let result = runner().run("abc", None, &mut provider, &sink).await;

    assert!(result.is_final());
    assert_eq!(sink.event_types(), expected_single_pass_types());
    assert!(sink.events().iter().all(|e| e.session_id() == "abc"));

    let samples: Vec<usize> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PingSample { sample, .. } => Some(*sample),
            _ => None,
        })
        .collect();
    assert_eq!(samples, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn single_pass_metrics() {
    let (mut provider, _log) = FakeProvider::new(FakeScript::standard());
    let sink = RecordingSink::new();

    let result = runner().run("abc", None, &mut provider, &sink).await;
    let result = result.as_final().unwrap();

    // Samples 10, 12, 11, 15, 13
    assert_eq!(result.ping, 12.2);
    assert_eq!(result.jitter, 2.25);
    assert_eq!(result.download, 95.5);
    assert_eq!(result.upload, 40.0);
    assert_eq!(result.server.id, "mid");

    let events = sink.events();
    let download_progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::DownloadProgress { download, .. } => Some(*download),
            _ => None,
        })
        .collect();
    assert!(download_progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(download_progress[0] > 95.5 * 0.8 && download_progress[0] < 95.5);
    assert!((download_progress[19] - 95.5 * 1.2).abs() < 0.01);

    let upload_progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::UploadProgress { upload, .. } => Some(*upload),
            _ => None,
        })
        .collect();
    assert!(upload_progress[0] > 40.0 * 0.7);
    assert!((upload_progress[19] - 40.0 * 1.2).abs() < 0.01);
}

#[tokio::test]
async fn download_failure_ends_pass_with_one_error() {
    let (mut provider, log) = FakeProvider::new(FakeScript::standard().fail_download_calls([1]));
    let sink = RecordingSink::new();

    let result = runner().run("abc", None, &mut provider, &sink).await;

    match result {
        TestResult::Error(failed) => {
            assert_eq!(failed.session_id, "abc");
            assert_eq!(
                failed.message,
                "Measurement error: Download: connection reset during download"
            );
        }
        TestResult::Final(_) => panic!("expected an error result"),
    }
    assert_eq!(sink.count("error"), 1);
    assert_eq!(sink.count("final"), 0);
    assert_eq!(sink.count("download_progress"), 0);
    assert_eq!(sink.count("upload_progress"), 0);
    assert_eq!(sink.event_types().last(), Some(&"error"));
    assert_eq!(log.count("upload"), 0);
}

#[tokio::test]
async fn client_info_failure_stops_before_selection() {
    let mut script = FakeScript::standard();
    script.fail_client_info = true;
    let (mut provider, log) = FakeProvider::new(script);
    let sink = RecordingSink::new();

    let result = runner().run("abc", None, &mut provider, &sink).await;

    assert!(!result.is_final());
    assert_eq!(sink.event_types(), vec!["status", "error"]);
    assert_eq!(log.count("list"), 0);

    // Failure keeps its category and names the step that failed
    let events = sink.events();
    match events.last() {
        Some(SessionEvent::Error { message, .. }) => {
            assert_eq!(message, "Network error: Client information: meta endpoint unreachable")
        }
        other => panic!("expected an error event, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_preferred_server_is_reported_as_error_event() {
    let (mut provider, _log) = FakeProvider::new(FakeScript::standard());
    let sink = RecordingSink::new();

    runner().run("abc", Some("nowhere"), &mut provider, &sink).await;

    let events = sink.events();
    let message = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::Error { message, .. } => Some(message.clone()),
            _ => None,
        })
        .unwrap();
    assert!(message.starts_with("Server resolution error:"));
    assert!(message.contains("nowhere"));
    assert_eq!(sink.count("server_selected"), 0);
}

#[tokio::test]
async fn single_test_stream_ends_after_final() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, SessionTimings::immediate());

    let stream = manager.start_single_test("single-1", None).await.unwrap();
    let events = stream.collect_all().await;

    assert_eq!(events.last().map(SessionEvent::event_type), Some("final"));
    assert_eq!(final_results(&events).len(), 1);
    assert!(manager.registry().is_empty().await);
}

#[tokio::test]
async fn final_result_renders_timestamp() {
    let (mut provider, _log) = FakeProvider::new(FakeScript::standard());
    let sink = RecordingSink::new();
    runner().run("abc", None, &mut provider, &sink).await;

    let final_event = sink.events().into_iter().last().unwrap();
    let text = OutputCoordinator::from_flags(false, false, false)
        .render_event(&final_event)
        .unwrap()
        .unwrap();
    let pattern = regex::Regex::new(r"Tested at: \d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").unwrap();
    assert!(pattern.is_match(&text), "{}", text);
}

// --- continuous sessions ---

#[tokio::test(start_paused = true)]
async fn continuous_session_runs_until_window_elapses() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, paced_timings());
    let sink = Arc::new(RecordingSink::new());

    let task = manager
        .spawn_continuous_test("cont", 1, None, sink.clone())
        .await
        .unwrap();
    let outcome = task.await.unwrap();

    // Passes at 0 s, 20 s and 40 s; the window closes at 60 s
    assert_eq!(outcome.iterations, 3);
    assert!(!outcome.stopped);
    let report = outcome.report.unwrap();
    assert_eq!(report.test_count, 3);
    assert_eq!(report.duration, 1);
    assert_eq!(report.test_type, "continuous");
    assert_eq!(report.stability_score, 100.0);

    let types = sink.event_types();
    assert_eq!(types.first(), Some(&"continuous_started"));
    assert_eq!(types.last(), Some(&"continuous"));
    assert_eq!(sink.count("running_stats"), 3);
    assert_eq!(sink.count("final"), 3);
    assert_eq!(sink.count("test_stopped"), 0);

    let progress: Vec<u8> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            SessionEvent::RunningStats { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![0, 33, 67]);

    assert!(manager.registry().is_empty().await);
    assert_eq!(factory.created(), 1);
}

#[tokio::test(start_paused = true)]
async fn running_stats_average_accumulated_results() {
    let factory = FakeFactory::new(FakeScript::standard().downloads(vec![50.0, 60.0]));
    let manager = manager(&factory, paced_timings());
    let sink = Arc::new(RecordingSink::new());

    let task = manager
        .spawn_continuous_test("avg", 1, None, sink.clone())
        .await
        .unwrap();
    task.await.unwrap();

    let stats: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::RunningStats { stats, .. } => Some(stats),
            _ => None,
        })
        .collect();

    assert_eq!(stats[0].count, 1);
    assert_eq!(stats[0].download.avg, 50.0);
    assert_eq!(stats[1].count, 2);
    assert_eq!(stats[1].download.avg, 55.0);
    assert_eq!(stats[1].download.min, 50.0);
    assert_eq!(stats[1].download.max, 60.0);
}

#[tokio::test(start_paused = true)]
async fn failed_iterations_are_skipped_in_the_report() {
    let factory = FakeFactory::new(FakeScript::standard().fail_download_calls([2]));
    let manager = manager(&factory, paced_timings());
    let sink = Arc::new(RecordingSink::new());

    let outcome = manager
        .spawn_continuous_test("gap", 1, None, sink.clone())
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.report.unwrap().test_count, 2);
    assert_eq!(sink.count("error"), 1);
    assert_eq!(sink.count("running_stats"), 2);

    // Only successful passes update the running figures
    let running: Vec<(usize, u8)> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            SessionEvent::RunningStats { stats, progress, .. } => Some((stats.count, *progress)),
            _ => None,
        })
        .collect();
    assert_eq!(running, vec![(1, 0), (2, 67)]);

    // The failed second pass is followed directly by the third pass
    let types = sink.event_types();
    let error_at = types.iter().position(|t| *t == "error").unwrap();
    assert_eq!(types[error_at + 1], "status");
}

#[tokio::test(start_paused = true)]
async fn no_successful_pass_means_no_report() {
    let factory = FakeFactory::new(FakeScript::standard().fail_download_calls(1..=10));
    let manager = manager(&factory, paced_timings());
    let sink = Arc::new(RecordingSink::new());

    let outcome = manager
        .spawn_continuous_test("none", 1, None, sink.clone())
        .await
        .unwrap()
        .await
        .unwrap();

    assert!(outcome.report.is_none());
    assert_eq!(outcome.iterations, 3);
    assert_eq!(sink.count("continuous"), 0);
    assert_eq!(sink.count("error"), 3);
    assert_eq!(sink.count("running_stats"), 0);
    assert_eq!(sink.event_types().last(), Some(&"error"));
    assert!(manager.registry().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn zero_minute_window_runs_no_pass() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, paced_timings());
    let sink = Arc::new(RecordingSink::new());

    let outcome = manager
        .spawn_continuous_test("empty", 0, None, sink.clone())
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(outcome.iterations, 0);
    assert!(outcome.report.is_none());
    assert_eq!(sink.event_types(), vec!["continuous_started"]);
}

#[tokio::test(start_paused = true)]
async fn stop_ends_session_at_next_boundary_with_partial_report() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, paced_timings());
    let sink = Arc::new(RecordingSink::new());

    let task = manager
        .spawn_continuous_test("stop-me", 10, None, sink.clone())
        .await
        .unwrap();

    // Passes at 0 s and 20 s have finished; the loop is waiting for 40 s
    tokio::time::sleep(Duration::from_secs(30)).await;
    let ack = manager.stop_test("stop-me").await;
    assert_eq!(
        ack,
        SessionEvent::TestStopped {
            session_id: "stop-me".to_string()
        }
    );

    let outcome = task.await.unwrap();
    assert!(outcome.stopped);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.report.unwrap().test_count, 2);

    let types = sink.event_types();
    let n = types.len();
    assert_eq!(&types[n - 2..], &["continuous", "test_stopped"]);
    assert!(manager.registry().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn stop_of_unknown_session_is_acknowledged() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, paced_timings());

    let ack = manager.stop_test("ghost").await;
    assert_eq!(ack.event_type(), "test_stopped");
    assert_eq!(ack.session_id(), "ghost");
    assert!(manager.registry().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn duplicate_running_id_is_rejected() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, paced_timings());

    let stream = manager.start_continuous_test("dup", 5, None).await.unwrap();

    let err = manager.start_single_test("dup", None).await.err().unwrap();
    assert!(matches!(err, AppError::SessionConflict(_)));
    let err = manager.start_continuous_test("dup", 5, None).await.err().unwrap();
    assert!(matches!(err, AppError::SessionConflict(_)));

    let active = manager.registry().active_sessions().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].session_id, "dup");

    manager.stop_test("dup").await;
    let events = stream.collect_all().await;
    assert_eq!(events.last().map(SessionEvent::event_type), Some("test_stopped"));
}

#[tokio::test(start_paused = true)]
async fn reused_id_survives_predecessor_shutdown() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, paced_timings());

    let first = manager
        .spawn_continuous_test("reuse", 10, None, Arc::new(RecordingSink::new()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    manager.stop_test("reuse").await;

    let second = manager
        .spawn_continuous_test("reuse", 10, None, Arc::new(RecordingSink::new()))
        .await
        .unwrap();

    let first_outcome = first.await.unwrap();
    assert!(first_outcome.stopped);
    assert!(manager.registry().contains("reuse").await);

    manager.stop_test("reuse").await;
    assert!(second.await.unwrap().stopped);
    assert!(manager.registry().is_empty().await);
}

#[tokio::test]
async fn listing_servers_orders_by_distance_and_truncates() {
    let factory = FakeFactory::new(FakeScript::standard());
    let manager = manager(&factory, SessionTimings::immediate());

    let servers = manager.list_servers(3).await.unwrap();
    let ids: Vec<&str> = servers.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid", "edge"]);
    assert!(servers.iter().all(|s| s.latency.is_none()));
}

#[test]
fn fake_candidates_carry_location() {
    assert_eq!(candidate("x", 1.0).location(), "x city, Testland");
    assert!(FakeFactory::new(FakeScript::standard()).create().is_ok());
}
