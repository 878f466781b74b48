use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Returns the URL as the body; URLs ending in `/fail` get HTTP 500.
struct EchoFetcher;

impl Fetcher for EchoFetcher {
    fn get(&self, url: &str, _cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        if url.ends_with("/fail") {
            return Err(FetchError::Status(500));
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// Sleeps for `delay` and tracks how many calls overlap.
#[derive(Default)]
struct SlowFetcher {
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Fetcher for SlowFetcher {
    fn get(&self, _url: &str, _cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(b"ok".to_vec())
    }
}

/// Blocks until the scope is cancelled, then reports an abort.
struct HangingFetcher;

impl Fetcher for HangingFetcher {
    fn get(&self, _url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        while !cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(5));
        }
        Err(FetchError::Aborted)
    }
}

struct Harness {
    url_tx: mpsc::Sender<String>,
    completion_rx: oneshot::Receiver<()>,
    payloads: tokio::task::JoinHandle<Vec<Vec<u8>>>,
    stage: tokio::task::JoinHandle<FetchStageSummary>,
    metrics: Arc<FetchMetrics>,
    cancel: CancellationToken,
}

fn start(fetcher: Arc<dyn Fetcher>, max_concurrent: usize) -> Harness {
    let (url_tx, url_rx) = mpsc::channel(1);
    let (payload_tx, mut payload_rx) = mpsc::channel::<Vec<u8>>(1);
    let (completion_tx, completion_rx) = oneshot::channel();
    let metrics = Arc::new(FetchMetrics::new());
    let cancel = CancellationToken::new();
    let stage = tokio::spawn(run_fetch_stage(FetchStage {
        url_rx,
        payload_tx,
        completion_tx,
        limiter: AdmissionLimiter::new(max_concurrent),
        fetcher,
        metrics: Arc::clone(&metrics),
        cancel: cancel.clone(),
    }));
    let payloads = tokio::spawn(async move {
        let mut out = Vec::new();
        while let Some(p) = payload_rx.recv().await {
            out.push(p);
        }
        out
    });
    Harness {
        url_tx,
        completion_rx,
        payloads,
        stage,
        metrics,
        cancel,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn successes_forwarded_and_failures_counted() {
    let h = start(Arc::new(EchoFetcher), DEFAULT_MAX_CONCURRENT);
    for i in 0..10 {
        let url = if i % 3 == 0 {
            format!("https://h{}.test/fail", i)
        } else {
            format!("https://h{}.test/", i)
        };
        h.url_tx.send(url).await.unwrap();
    }
    drop(h.url_tx);

    h.completion_rx.await.expect("completion signal");
    let summary = h.stage.await.unwrap();
    let mut payloads = h.payloads.await.unwrap();
    payloads.sort();

    let snap = h.metrics.snapshot();
    assert_eq!(summary.dispatched, 10);
    assert!(!summary.stopped_by_cancel);
    assert_eq!(snap.failed, 4);
    assert_eq!(snap.succeeded, 6);
    assert_eq!(snap.attempted(), 10);
    assert_eq!(payloads.len(), 6);
    assert!(payloads.iter().all(|p| !p.ends_with(b"/fail")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_stream_completes_with_no_work() {
    let h = start(Arc::new(EchoFetcher), DEFAULT_MAX_CONCURRENT);
    drop(h.url_tx);
    h.completion_rx.await.expect("completion signal");
    let summary = h.stage.await.unwrap();
    assert_eq!(summary.dispatched, 0);
    assert!(h.payloads.await.unwrap().is_empty());
    assert_eq!(h.metrics.snapshot(), MetricsSnapshot::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_exceeds_admission_cap() {
    let fetcher = Arc::new(SlowFetcher {
        delay: Duration::from_millis(20),
        ..SlowFetcher::default()
    });
    let h = start(Arc::clone(&fetcher) as Arc<dyn Fetcher>, 5);
    for i in 0..40 {
        h.url_tx.send(format!("https://h{}.test/", i)).await.unwrap();
    }
    drop(h.url_tx);

    h.completion_rx.await.unwrap();
    let summary = h.stage.await.unwrap();
    assert_eq!(h.payloads.await.unwrap().len(), 40);
    assert!(summary.peak_in_flight <= 5, "peak {}", summary.peak_in_flight);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 5);
    assert_eq!(h.metrics.snapshot().succeeded, 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn default_cap_is_fifty() {
    let fetcher = Arc::new(SlowFetcher {
        delay: Duration::from_millis(10),
        ..SlowFetcher::default()
    });
    let h = start(Arc::clone(&fetcher) as Arc<dyn Fetcher>, DEFAULT_MAX_CONCURRENT);
    for i in 0..200 {
        h.url_tx.send(format!("https://h{}.test/", i)).await.unwrap();
    }
    drop(h.url_tx);

    h.completion_rx.await.unwrap();
    let summary = h.stage.await.unwrap();
    assert_eq!(h.payloads.await.unwrap().len(), 200);
    assert!(summary.peak_in_flight <= 50);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancellation_stops_admission_and_still_completes() {
    let h = start(Arc::new(HangingFetcher), 2);
    let url_tx = h.url_tx.clone();
    let producer = tokio::spawn(async move {
        let mut sent = 0u64;
        for i in 0..100 {
            if url_tx.send(format!("https://h{}.test/", i)).await.is_err() {
                break;
            }
            sent += 1;
        }
        sent
    });
    drop(h.url_tx);

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.cancel.cancel();

    tokio::time::timeout(Duration::from_secs(5), h.completion_rx)
        .await
        .expect("stage finishes after cancel")
        .unwrap();
    let summary = h.stage.await.unwrap();
    let sent = producer.await.unwrap();

    assert!(summary.stopped_by_cancel);
    assert_eq!(summary.dispatched, 2, "only the first two fit under the cap");
    assert!(sent < 100, "receiver dropped on cancel, producer unblocked");
    let snap = h.metrics.snapshot();
    assert_eq!(snap.failed, 2);
    assert_eq!(snap.succeeded, 0);
    assert!(snap.attempted() <= sent);
    assert!(h.payloads.await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn payload_channel_closes_before_completion_signal() {
    let (url_tx, url_rx) = mpsc::channel(1);
    let (payload_tx, mut payload_rx) = mpsc::channel::<Vec<u8>>(4);
    let (completion_tx, completion_rx) = oneshot::channel();
    let stage = tokio::spawn(run_fetch_stage(FetchStage {
        url_rx,
        payload_tx,
        completion_tx,
        limiter: AdmissionLimiter::new(4),
        fetcher: Arc::new(EchoFetcher),
        metrics: Arc::new(FetchMetrics::new()),
        cancel: CancellationToken::new(),
    }));
    url_tx.send("https://a.test/".to_string()).await.unwrap();
    drop(url_tx);

    completion_rx.await.unwrap();
    // By the time completion is observed the sender side is gone.
    assert_eq!(payload_rx.recv().await.as_deref(), Some(&b"https://a.test/"[..]));
    assert!(payload_rx.recv().await.is_none());
    stage.await.unwrap();
}
