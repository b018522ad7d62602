//! Integration tests: real worker threads against a local HTTP server.

mod common;

use common::http_server::{self, Canned};
use common::{collect_until_terminal, temp_files};
use fetchbot_core::{
    download, report_queue, DownloadError, FilePermission, PlacementLock, Report, ReportKind,
    ReportTag, Supervisor, ThreadOption, TransferError,
};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const TIMEOUT: Duration = Duration::from_secs(20);

fn option() -> ThreadOption {
    ThreadOption {
        chunk_size: 500,
        report_interval_secs: 0.0,
        speedmeter_size: 10,
        file_permission: None,
        require_content_length: false,
    }
}

/// Run one job to completion with the free `download` function and return its reports.
fn run_single(url: &str, path: &Path, option: &ThreadOption) -> Vec<Report<&'static str>> {
    let (tx, drain) = report_queue();
    let handle = download(url, path, "job", tx, option, &PlacementLock::new()).unwrap();
    handle.thread.join().unwrap();
    assert!(handle.controller.is_finished());
    drain.drain()
}

fn tags<I>(reports: &[Report<I>]) -> Vec<ReportTag> {
    reports.iter().map(|r| r.tag()).collect()
}

#[test]
fn scenario_a_declared_size_two_chunks() {
    let body: Vec<u8> = (0u8..=249).cycle().take(1000).collect();
    let url = http_server::serve(Canned::ok(body.clone()).pieces(500, Duration::ZERO));
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.bin");

    let reports = run_single(&url, &path, &option());

    let first = reports.first().expect("reports");
    match &first.kind {
        ReportKind::Start { response, progress } => {
            assert_eq!(progress.file_size, Some(1000));
            assert_eq!(response.status, 200);
            assert_eq!(response.content_length(), Some(1000));
            assert_eq!(response.final_url, url);
        }
        other => panic!("expected Start, got {other:?}"),
    }
    let last = reports.last().unwrap();
    match &last.kind {
        ReportKind::Finish {
            saved_path,
            progress,
        } => {
            assert_eq!(saved_path, &path);
            assert_eq!(progress.downloaded_size, 1000);
            assert_eq!(progress.file_size, Some(1000));
        }
        other => panic!("expected Finish, got {other:?}"),
    }
    assert!(reports[1..reports.len() - 1]
        .iter()
        .all(|r| r.tag() == ReportTag::Progress));
    assert!(reports.iter().all(|r| r.info == "job" && r.url == url && r.requested_path == path));

    // Progress snapshots never go backwards.
    let sizes: Vec<u64> = reports
        .iter()
        .filter_map(|r| r.kind.progress())
        .map(|p| p.downloaded_size)
        .collect();
    assert!(sizes.windows(2).all(|w| w[0] <= w[1]));

    assert_eq!(fs::read(&path).unwrap(), body);
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn scenario_b_not_found_is_single_transfer_error() {
    let url = http_server::serve(Canned::status("404 Not Found", b"not found"));
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.bin");

    let reports = run_single(&url, &path, &option());

    assert_eq!(tags(&reports), vec![ReportTag::Error]);
    match reports[0].error() {
        Some(DownloadError::Transfer(TransferError::Status { code })) => assert_eq!(*code, 404),
        other => panic!("expected HTTP status error, got {other:?}"),
    }
    assert!(!path.exists());
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn server_error_without_body_is_transfer_error() {
    let url = http_server::serve(Canned::status("503 Service Unavailable", b""));
    let dir = tempdir().unwrap();
    let reports = run_single(&url, &dir.path().join("x"), &option());
    assert_eq!(tags(&reports), vec![ReportTag::Error]);
    assert_eq!(reports[0].error().map(|e| e.kind()), Some("transfer"));
}

#[test]
fn scenario_c_existing_destination_gets_sibling_name() {
    let body = b"fresh content".to_vec();
    let url = http_server::serve(Canned::ok(body.clone()));
    let dir = tempdir().unwrap();
    let path = dir.path().join("name.ext");
    fs::write(&path, b"previous content").unwrap();

    let reports = run_single(&url, &path, &option());

    let saved = reports
        .last()
        .and_then(|r| r.saved_path())
        .expect("finish report")
        .to_path_buf();
    assert_eq!(saved, dir.path().join("name_0.ext"));
    assert_eq!(fs::read(&path).unwrap(), b"previous content");
    assert_eq!(fs::read(&saved).unwrap(), body);
}

#[test]
fn missing_destination_directory_is_created() {
    let url = http_server::serve(Canned::ok(b"abc".to_vec()));
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/deeper/file.txt");
    let reports = run_single(&url, &path, &option());
    assert_eq!(reports.last().map(|r| r.tag()), Some(ReportTag::Finish));
    assert_eq!(fs::read(&path).unwrap(), b"abc");
}

#[test]
fn unknown_size_is_accepted_by_default() {
    let body = vec![7u8; 700];
    let url = http_server::serve(Canned::ok(body.clone()).declared(None).pieces(100, Duration::ZERO));
    let dir = tempdir().unwrap();
    let path = dir.path().join("nosize.bin");

    let reports = run_single(&url, &path, &option());

    match &reports.last().unwrap().kind {
        ReportKind::Finish { progress, .. } => {
            assert_eq!(progress.file_size, None);
            assert_eq!(progress.downloaded_size, 700);
            assert_eq!(progress.progress_rate(), None);
        }
        other => panic!("expected Finish, got {other:?}"),
    }
    assert_eq!(fs::read(&path).unwrap(), body);
}

#[test]
fn unknown_size_is_rejected_when_strict() {
    let url = http_server::serve(Canned::ok(vec![1u8; 300]).declared(None));
    let dir = tempdir().unwrap();
    let path = dir.path().join("strict.bin");
    let strict = ThreadOption {
        require_content_length: true,
        ..option()
    };

    let reports = run_single(&url, &path, &strict);

    assert_eq!(reports.first().map(|r| r.tag()), Some(ReportTag::Start));
    match reports.last().and_then(|r| r.error()) {
        Some(DownloadError::UndeclaredSize { progress }) => assert_eq!(progress.downloaded_size, 300),
        other => panic!("expected UndeclaredSize, got {other:?}"),
    }
    assert!(!path.exists());
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn truncated_body_is_incomplete() {
    let url = http_server::serve(Canned::ok(vec![3u8; 600]).declared(Some(1000)));
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.bin");

    let reports = run_single(&url, &path, &option());

    assert_eq!(reports.first().map(|r| r.tag()), Some(ReportTag::Start));
    let error = reports.last().and_then(|r| r.error()).expect("error report");
    assert_eq!(error.kind(), "incomplete");
    assert!(!path.exists());
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn redirect_reports_final_url() {
    let base = http_server::serve_routes(vec![
        ("/old", Canned::redirect("/new")),
        ("/new", Canned::ok(b"moved".to_vec())),
    ]);
    let dir = tempdir().unwrap();
    let path = dir.path().join("moved.txt");

    let reports = run_single(&format!("{}old", base), &path, &option());

    match &reports[0].kind {
        ReportKind::Start { response, .. } => {
            assert_eq!(response.final_url, format!("{}new", base));
            assert_eq!(response.content_length(), Some(5));
        }
        other => panic!("expected Start, got {other:?}"),
    }
    assert_eq!(fs::read(&path).unwrap(), b"moved");
}

#[test]
fn empty_body_still_starts_and_finishes() {
    let url = http_server::serve(Canned::ok(Vec::new()));
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty");
    let reports = run_single(&url, &path, &option());
    assert_eq!(tags(&reports), vec![ReportTag::Start, ReportTag::Finish]);
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn chunk_size_bounds_progress_granularity() {
    let url = http_server::serve(Canned::ok(vec![0u8; 1000]));
    let dir = tempdir().unwrap();
    let opt = ThreadOption {
        chunk_size: 100,
        ..option()
    };
    let reports = run_single(&url, &dir.path().join("g.bin"), &opt);
    let sizes: Vec<u64> = reports
        .iter()
        .filter(|r| r.tag() == ReportTag::Progress)
        .filter_map(|r| r.kind.progress())
        .map(|p| p.downloaded_size)
        .collect();
    // a zero report interval yields one PROGRESS per piece of at most 100 bytes
    assert!(sizes.len() >= 10);
    assert_eq!(sizes.last(), Some(&1000));
    let mut prev = 0;
    for size in sizes {
        assert!(size > prev && size - prev <= 100);
        prev = size;
    }
}

#[test]
fn long_report_interval_suppresses_progress() {
    let url = http_server::serve(Canned::ok(vec![0u8; 2000]).pieces(500, Duration::ZERO));
    let dir = tempdir().unwrap();
    let opt = ThreadOption {
        report_interval_secs: 3600.0,
        ..option()
    };
    let reports = run_single(&url, &dir.path().join("q.bin"), &opt);
    assert_eq!(tags(&reports), vec![ReportTag::Start, ReportTag::Finish]);
}

#[test]
fn oversized_report_interval_still_finishes() {
    let url = http_server::serve(Canned::ok(vec![3u8; 1500]).pieces(500, Duration::ZERO));
    let dir = tempdir().unwrap();
    let path = dir.path().join("big-interval.bin");
    let opt = ThreadOption {
        report_interval_secs: 1e20,
        ..option()
    };
    let reports = run_single(&url, &path, &opt);
    assert_eq!(tags(&reports), vec![ReportTag::Start, ReportTag::Finish]);
    assert_eq!(fs::read(&path).unwrap().len(), 1500);
}

#[test]
fn invalid_option_is_rejected_before_spawn() {
    let (tx, drain) = report_queue::<&str>();
    let dir = tempdir().unwrap();
    let opt = ThreadOption {
        chunk_size: 0,
        ..option()
    };
    let res = download(
        "http://127.0.0.1:9/x",
        &dir.path().join("x"),
        "job",
        tx,
        &opt,
        &PlacementLock::new(),
    );
    assert!(res.is_err());
    assert!(drain.drain().is_empty());
}

#[test]
fn non_http_url_is_rejected_without_reading() {
    let dir = tempdir().unwrap();
    let secret = dir.path().join("secret.txt");
    fs::write(&secret, b"local secret").unwrap();
    let url = format!("file://{}", secret.display());
    let out = dir.path().join("out").join("copy.txt");

    let reports = run_single(&url, &out, &option());

    assert_eq!(tags(&reports), vec![ReportTag::Error]);
    match reports[0].error() {
        Some(DownloadError::Transfer(TransferError::UnsupportedScheme { scheme })) => {
            assert_eq!(scheme, "file")
        }
        other => panic!("expected unsupported scheme, got {other:?}"),
    }
    assert!(!out.exists());
    assert!(temp_files(&dir.path().join("out")).is_empty());
}

#[cfg(unix)]
#[test]
fn file_permission_is_applied() {
    use std::os::unix::fs::PermissionsExt;
    let url = http_server::serve(Canned::ok(b"perm".to_vec()));
    let dir = tempdir().unwrap();
    let path = dir.path().join("perm.txt");
    let opt = ThreadOption {
        file_permission: Some(FilePermission::new(0o640)),
        ..option()
    };
    run_single(&url, &path, &opt);
    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
}

#[test]
fn cancel_yields_single_error_and_cleans_up() {
    let url = http_server::serve(Canned::ok(vec![9u8; 100 * 1000]).pieces(1000, Duration::from_millis(20)));
    let dir = tempdir().unwrap();
    let path = dir.path().join("slow.bin");
    let mut sup: Supervisor<u8> = Supervisor::new(ThreadOption {
        chunk_size: 1000,
        ..option()
    });
    let controller = sup.start(&url, &path, 1).unwrap();

    // Wait until the stream is running before cancelling.
    let deadline = Instant::now() + TIMEOUT;
    let mut reports = Vec::new();
    while !reports.iter().any(|r: &Report<u8>| r.tag() == ReportTag::Start) {
        assert!(Instant::now() < deadline, "no START report");
        reports.extend(sup.drain());
        std::thread::sleep(Duration::from_millis(5));
    }
    sup.cancel_all();
    assert!(controller.is_canceled());

    reports.extend(collect_until_terminal(&sup, 1, TIMEOUT));
    let terminal: Vec<&Report<u8>> = reports.iter().filter(|r| r.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    match terminal[0].error() {
        Some(DownloadError::Cancelled { progress }) => assert!(progress.downloaded_size < 100 * 1000),
        other => panic!("expected Cancelled, got {other:?}"),
    }

    while !controller.is_finished() {
        assert!(Instant::now() < deadline, "controller never finished");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(sup.active_jobs(), 0);
    assert!(!path.exists());
    assert!(temp_files(dir.path()).is_empty());
    // nothing more arrives after the terminal report
    std::thread::sleep(Duration::from_millis(50));
    assert!(sup.drain().is_empty());
}

#[test]
fn concurrent_jobs_for_same_path_never_collide() {
    let body_a = vec![b'a'; 4000];
    let body_b = vec![b'b'; 4000];
    let base = http_server::serve_routes(vec![
        ("/a", Canned::ok(body_a.clone())),
        ("/b", Canned::ok(body_b.clone())),
    ]);
    let dir = tempdir().unwrap();
    let path = dir.path().join("same.bin");
    let lock = PlacementLock::new();
    let mut sup: Supervisor<char> = Supervisor::with_placement_lock(option(), lock.clone());

    {
        // Hold the finalize lock so both jobs queue up on it.
        let _guard = lock.lock();
        sup.start(&format!("{}a", base), &path, 'a').unwrap();
        sup.start(&format!("{}b", base), &path, 'b').unwrap();

        let deadline = Instant::now() + TIMEOUT;
        loop {
            let staged: Vec<u64> = temp_files(dir.path())
                .iter()
                .filter_map(|n| fs::metadata(dir.path().join(n)).ok())
                .map(|m| m.len())
                .collect();
            if staged.len() == 2 && staged.iter().all(|&len| len == 4000) {
                break;
            }
            assert!(Instant::now() < deadline, "jobs never finished streaming");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!path.exists());
    }

    let reports = collect_until_terminal(&sup, 2, TIMEOUT);
    let finished: Vec<(char, std::path::PathBuf)> = reports
        .iter()
        .filter_map(|r| r.saved_path().map(|p| (r.info, p.to_path_buf())))
        .collect();
    assert_eq!(finished.len(), 2);
    assert_ne!(finished[0].1, finished[1].1);

    let mut saved: Vec<_> = finished.iter().map(|(_, p)| p.clone()).collect();
    saved.sort();
    let mut expected = vec![path.clone(), dir.path().join("same_0.bin")];
    expected.sort();
    assert_eq!(saved, expected);

    for (info, saved_path) in &finished {
        let want = if *info == 'a' { &body_a } else { &body_b };
        assert_eq!(&fs::read(saved_path).unwrap(), want);
    }
}

#[test]
fn per_job_report_order_is_start_progress_terminal() {
    let base = http_server::serve_routes(vec![
        ("/x", Canned::ok(vec![1u8; 3000]).pieces(500, Duration::from_millis(2))),
        ("/y", Canned::ok(vec![2u8; 3000]).pieces(500, Duration::from_millis(2))),
        ("/z", Canned::status("404 Not Found", b"nope")),
    ]);
    let dir = tempdir().unwrap();
    let mut sup: Supervisor<&'static str> = Supervisor::new(option());
    for name in ["x", "y", "z"] {
        sup.start(&format!("{}{}", base, name), dir.path().join(name), name).unwrap();
    }

    let reports = collect_until_terminal(&sup, 3, TIMEOUT);
    for name in ["x", "y", "z"] {
        let seq: Vec<ReportTag> = reports.iter().filter(|r| r.info == name).map(|r| r.tag()).collect();
        let (last, rest) = seq.split_last().unwrap();
        assert!(matches!(last, ReportTag::Finish | ReportTag::Error), "{name}: {seq:?}");
        if name == "z" {
            assert!(rest.is_empty());
        } else {
            assert_eq!(rest[0], ReportTag::Start, "{name}: {seq:?}");
            assert!(rest[1..].iter().all(|t| *t == ReportTag::Progress), "{name}: {seq:?}");
        }
    }
}
