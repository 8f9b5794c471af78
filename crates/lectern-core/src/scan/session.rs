//! Barcode scan session state machine.
//!
//! A session owns the camera stream and the decoder for as long as the scan
//! UI is open. All state changes go through [`ScanSession::transition`];
//! decoder callbacks feed a channel and never touch session state
//! themselves. Teardown is unconditional and idempotent: whichever way the
//! session ends, the stream is stopped and the decoder shut down.

use super::isbn;
use crate::cancel::CancellationToken;
use crate::config::ScanConfig;
use crate::error::{LecternError, Result};
use crate::models::BookMetadata;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Camera device access.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Request exclusive access to the rear-facing camera.
    ///
    /// Fails if permission is denied, no camera exists, or the device is
    /// already held by another session.
    async fn acquire(&self) -> Result<Arc<dyn CameraStream>>;
}

/// A live camera stream bound to a preview.
pub trait CameraStream: Send + Sync {
    /// Stop the stream and release the device. Must be idempotent.
    fn stop(&self);
}

/// Live barcode decoding engine.
#[async_trait]
pub trait BarcodeDecoder: Send + Sync {
    /// Bind to the stream and start decoding. Every candidate code is sent
    /// into `candidates`; the sender is dropped when decoding stops.
    async fn start(
        &self,
        stream: Arc<dyn CameraStream>,
        candidates: mpsc::Sender<String>,
    ) -> Result<()>;

    /// Stop decoding. Must be idempotent.
    fn stop(&self);
}

/// Identifier-lookup collaborator.
#[async_trait]
pub trait IsbnLookup: Send + Sync {
    async fn lookup_isbn(&self, code: &str) -> Result<BookMetadata>;
}

/// Scan session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Scan UI not active.
    Idle,
    /// Waiting for camera access.
    Acquiring,
    /// Live decoding in progress.
    Scanning,
    /// A candidate code was accepted; decoding paused.
    Detected,
    /// Looking up the accepted code.
    Resolving,
    /// Lookup succeeded; session torn down.
    Success,
    /// Recoverable failure; manual entry remains available.
    RetryableError,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Acquiring => write!(f, "acquiring"),
            ScanState::Scanning => write!(f, "scanning"),
            ScanState::Detected => write!(f, "detected"),
            ScanState::Resolving => write!(f, "resolving"),
            ScanState::Success => write!(f, "success"),
            ScanState::RetryableError => write!(f, "retryable-error"),
        }
    }
}

/// Events emitted while a session runs.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    StateChanged(ScanState),
    /// A candidate passed the identifier filter; the UI issues the
    /// haptic/visual acknowledgment on this event.
    CodeAccepted { code: String },
    /// Recoverable failure with a user-facing message.
    Error { message: String },
}

/// Result of a successful scan, handed to the book-creation form.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub code: String,
    pub metadata: BookMetadata,
}

/// Interval at which the decode loop re-checks cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// State machine coordinating camera, decoder and lookup.
///
/// Create one per opening of the scan UI and drive it with
/// [`ScanSession::run`]; call [`ScanSession::close`] from any state to tear
/// down. Closing is idempotent and safe to call again after the session
/// ended on its own.
pub struct ScanSession {
    camera: Arc<dyn Camera>,
    decoder: Arc<dyn BarcodeDecoder>,
    lookup: Arc<dyn IsbnLookup>,
    state: Mutex<ScanState>,
    stream: Mutex<Option<Arc<dyn CameraStream>>>,
    cancel: CancellationToken,
    events: broadcast::Sender<ScanEvent>,
}

impl ScanSession {
    pub fn new(
        camera: Arc<dyn Camera>,
        decoder: Arc<dyn BarcodeDecoder>,
        lookup: Arc<dyn IsbnLookup>,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            camera,
            decoder,
            lookup,
            state: Mutex::new(ScanState::Idle),
            stream: Mutex::new(None),
            cancel: CancellationToken::new(),
            events,
        }
    }

    /// Current state.
    pub fn state(&self) -> ScanState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// The only place session state changes.
    fn transition(&self, to: ScanState) {
        let mut state = self.state.lock().expect("state lock poisoned");
        if *state == to {
            return;
        }
        debug!("Scan state {} -> {}", *state, to);
        *state = to;
        let _ = self.events.send(ScanEvent::StateChanged(to));
    }

    /// Release the camera stream and stop the decoder. Idempotent; called
    /// on every exit path.
    fn release(&self) {
        if let Some(stream) = self.stream.lock().expect("stream lock poisoned").take() {
            stream.stop();
            debug!("Camera stream stopped");
        }
        self.decoder.stop();
    }

    /// Tear the session down from any state.
    ///
    /// Safe to call repeatedly and from every state including `Idle`. An
    /// in-flight acquisition or lookup releases its resources as soon as it
    /// resolves.
    pub fn close(&self) {
        self.cancel.cancel();
        self.release();
        self.transition(ScanState::Idle);
    }

    fn fail(&self, err: &LecternError) {
        warn!("Scan session error: {}", err);
        self.release();
        let _ = self.events.send(ScanEvent::Error {
            message: err.user_message(),
        });
        self.transition(ScanState::RetryableError);
    }

    /// Drive the session to completion.
    ///
    /// Returns `Ok(Some(outcome))` when a code resolved to a book,
    /// `Ok(None)` when the session was closed, and `Err` on a failure that
    /// left the session in `RetryableError` (camera denied, decoder init
    /// failure, decoder stream ended). Lookup failures do not end the run;
    /// scanning resumes until a code resolves or the session is closed.
    pub async fn run(&self) -> Result<Option<ScanOutcome>> {
        self.transition(ScanState::Acquiring);

        let stream = match self.camera.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        // The permission prompt may have resolved after the UI was closed.
        if self.cancel.is_cancelled() {
            stream.stop();
            return Ok(None);
        }

        *self.stream.lock().expect("stream lock poisoned") = Some(stream.clone());

        let (tx, mut rx) = mpsc::channel(ScanConfig::CANDIDATE_BUFFER);
        if let Err(e) = self.decoder.start(stream, tx).await {
            self.fail(&e);
            return Err(e);
        }
        if self.cancel.is_cancelled() {
            self.release();
            return Ok(None);
        }

        self.transition(ScanState::Scanning);

        loop {
            if self.cancel.is_cancelled() {
                self.release();
                return Ok(None);
            }

            let code = match tokio::time::timeout(CANCEL_POLL, rx.recv()).await {
                Err(_) => continue,
                Ok(Some(code)) => code,
                Ok(None) => {
                    if self.cancel.is_cancelled() {
                        self.release();
                        return Ok(None);
                    }
                    let err = LecternError::DecoderFailed {
                        message: "decoder stopped unexpectedly".to_string(),
                    };
                    self.fail(&err);
                    return Err(err);
                }
            };

            let code = isbn::normalize(&code);
            if !isbn::is_candidate(&code) {
                // Not a book identifier; keep scanning without a transition.
                debug!("Ignoring non-ISBN candidate {}", code);
                continue;
            }

            // Pause candidate processing while the code resolves.
            self.transition(ScanState::Detected);
            let _ = self.events.send(ScanEvent::CodeAccepted { code: code.clone() });

            self.transition(ScanState::Resolving);
            let outcome = self.lookup.lookup_isbn(&code).await;

            if self.cancel.is_cancelled() {
                self.release();
                return Ok(None);
            }

            match outcome {
                Ok(metadata) => {
                    info!("Scan resolved ISBN {}", code);
                    self.release();
                    self.transition(ScanState::Success);
                    return Ok(Some(ScanOutcome { code, metadata }));
                }
                Err(e) => {
                    // Not found or transport failure: resume scanning so the
                    // user can try another code without reopening the camera.
                    warn!("Lookup failed for {}: {}", code, e);
                    let _ = self.events.send(ScanEvent::Error {
                        message: e.user_message(),
                    });
                    while rx.try_recv().is_ok() {
                        // Discard candidates queued while resolving.
                    }
                    self.transition(ScanState::Scanning);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct MockStream {
        stopped: Arc<AtomicBool>,
        held: Arc<AtomicBool>,
    }

    impl CameraStream for MockStream {
        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
            self.held.store(false, Ordering::SeqCst);
        }
    }

    /// Camera fake tracking exclusivity and the last stream's stop flag.
    struct MockCamera {
        deny: bool,
        delay: Duration,
        held: Arc<AtomicBool>,
        stream_stopped: Arc<AtomicBool>,
    }

    impl MockCamera {
        fn available() -> Self {
            Self {
                deny: false,
                delay: Duration::ZERO,
                held: Arc::new(AtomicBool::new(false)),
                stream_stopped: Arc::new(AtomicBool::new(false)),
            }
        }

        fn denied() -> Self {
            Self {
                deny: true,
                ..Self::available()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::available()
            }
        }

        fn stream_stopped(&self) -> bool {
            self.stream_stopped.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Camera for MockCamera {
        async fn acquire(&self) -> Result<Arc<dyn CameraStream>> {
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            if self.deny {
                return Err(LecternError::CameraUnavailable {
                    message: "permission denied".into(),
                });
            }
            if self.held.swap(true, Ordering::SeqCst) {
                return Err(LecternError::CameraUnavailable {
                    message: "camera already in use".into(),
                });
            }
            self.stream_stopped.store(false, Ordering::SeqCst);
            Ok(Arc::new(MockStream {
                stopped: self.stream_stopped.clone(),
                held: self.held.clone(),
            }))
        }
    }

    /// Decoder fake emitting a scripted sequence, then idling with the
    /// channel open until stopped.
    struct MockDecoder {
        codes: Vec<String>,
        fail_start: bool,
        stopped: Arc<AtomicBool>,
        retained: Mutex<Option<mpsc::Sender<String>>>,
    }

    impl MockDecoder {
        fn emitting(codes: &[&str]) -> Self {
            Self {
                codes: codes.iter().map(|s| s.to_string()).collect(),
                fail_start: false,
                stopped: Arc::new(AtomicBool::new(false)),
                retained: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                fail_start: true,
                ..Self::emitting(&[])
            }
        }

        fn is_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BarcodeDecoder for MockDecoder {
        async fn start(
            &self,
            _stream: Arc<dyn CameraStream>,
            candidates: mpsc::Sender<String>,
        ) -> Result<()> {
            if self.fail_start {
                return Err(LecternError::DecoderFailed {
                    message: "engine init failed".into(),
                });
            }
            self.stopped.store(false, Ordering::SeqCst);
            *self.retained.lock().unwrap() = Some(candidates.clone());
            let codes = self.codes.clone();
            tokio::spawn(async move {
                for code in codes {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if candidates.send(code).await.is_err() {
                        break;
                    }
                }
            });
            Ok(())
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
            self.retained.lock().unwrap().take();
        }
    }

    /// Lookup fake failing a scripted number of times before succeeding.
    struct MockLookup {
        fail_times: AtomicU32,
        calls: AtomicU32,
        delay: Duration,
    }

    impl MockLookup {
        fn found() -> Self {
            Self {
                fail_times: AtomicU32::new(0),
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn failing_first(times: u32) -> Self {
            Self {
                fail_times: AtomicU32::new(times),
                ..Self::found()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::found()
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IsbnLookup for MockLookup {
        async fn lookup_isbn(&self, code: &str) -> Result<BookMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            let remaining = self.fail_times.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_times.store(remaining - 1, Ordering::SeqCst);
                return Err(LecternError::IsbnNotFound {
                    code: code.to_string(),
                });
            }
            Ok(BookMetadata {
                title: "The C Programming Language".to_string(),
                authors: vec!["Kernighan".to_string(), "Ritchie".to_string()],
                isbn: Some(code.to_string()),
                ..Default::default()
            })
        }
    }

    fn session(
        camera: Arc<MockCamera>,
        decoder: Arc<MockDecoder>,
        lookup: Arc<MockLookup>,
    ) -> ScanSession {
        ScanSession::new(camera, decoder, lookup)
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_resolves_and_tears_down() {
        let camera = Arc::new(MockCamera::available());
        let decoder = Arc::new(MockDecoder::emitting(&["9780131103627"]));
        let lookup = Arc::new(MockLookup::found());
        let session = session(camera.clone(), decoder.clone(), lookup.clone());

        let outcome = session.run().await.unwrap().unwrap();
        assert_eq!(outcome.code, "9780131103627");
        assert_eq!(outcome.metadata.title, "The C Programming Language");

        assert_eq!(session.state(), ScanState::Success);
        assert!(camera.stream_stopped());
        assert!(decoder.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_isbn_candidates_ignored_without_transition() {
        let camera = Arc::new(MockCamera::available());
        // 13 digits without a Bookland prefix, then a real ISBN
        let decoder = Arc::new(MockDecoder::emitting(&[
            "1234567890123",
            "9780131103627",
        ]));
        let lookup = Arc::new(MockLookup::found());
        let session = session(camera, decoder, lookup.clone());
        let mut events = session.subscribe();

        session.run().await.unwrap().unwrap();

        assert_eq!(lookup.call_count(), 1);
        let mut accepted = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ScanEvent::CodeAccepted { code } = event {
                accepted.push(code);
            }
        }
        assert_eq!(accepted, vec!["9780131103627".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_denied_is_retryable() {
        let camera = Arc::new(MockCamera::denied());
        let decoder = Arc::new(MockDecoder::emitting(&[]));
        let session = session(camera, decoder, Arc::new(MockLookup::found()));

        let result = session.run().await;
        assert!(matches!(
            result,
            Err(LecternError::CameraUnavailable { .. })
        ));
        assert_eq!(session.state(), ScanState::RetryableError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_exclusively_owned() {
        let camera = Arc::new(MockCamera::available());
        let held = camera.acquire().await.unwrap();

        let decoder = Arc::new(MockDecoder::emitting(&[]));
        let session = session(camera.clone(), decoder, Arc::new(MockLookup::found()));
        let result = session.run().await;
        assert!(matches!(
            result,
            Err(LecternError::CameraUnavailable { .. })
        ));
        assert_eq!(session.state(), ScanState::RetryableError);

        held.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoder_init_failure_releases_stream() {
        let camera = Arc::new(MockCamera::available());
        let decoder = Arc::new(MockDecoder::failing());
        let session = session(camera.clone(), decoder, Arc::new(MockLookup::found()));

        let result = session.run().await;
        assert!(matches!(result, Err(LecternError::DecoderFailed { .. })));
        assert_eq!(session.state(), ScanState::RetryableError);
        // The stream must not stay acquired behind a failed decoder
        assert!(camera.stream_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_resumes_scanning() {
        let camera = Arc::new(MockCamera::available());
        let decoder = Arc::new(MockDecoder::emitting(&[
            "9780131103627",
            "9780131103627",
        ]));
        let lookup = Arc::new(MockLookup::failing_first(1));
        let session = session(camera.clone(), decoder.clone(), lookup.clone());
        let mut events = session.subscribe();

        let outcome = session.run().await.unwrap().unwrap();
        assert_eq!(outcome.code, "9780131103627");
        assert_eq!(lookup.call_count(), 2);

        // The failed lookup surfaced an error event and went back to
        // scanning rather than terminating
        let mut saw_error = false;
        let mut rescanned = false;
        while let Ok(event) = events.try_recv() {
            match event {
                ScanEvent::Error { .. } => saw_error = true,
                ScanEvent::StateChanged(ScanState::Scanning) if saw_error => rescanned = true,
                _ => {}
            }
        }
        assert!(saw_error);
        assert!(rescanned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_from_idle_is_safe() {
        let camera = Arc::new(MockCamera::available());
        let decoder = Arc::new(MockDecoder::emitting(&[]));
        let session = session(camera, decoder.clone(), Arc::new(MockLookup::found()));

        session.close();
        session.close();
        assert_eq!(session.state(), ScanState::Idle);
        assert!(decoder.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_acquiring_releases_stream() {
        let camera = Arc::new(MockCamera::slow(Duration::from_secs(5)));
        let decoder = Arc::new(MockDecoder::emitting(&[]));
        let session = Arc::new(session(
            camera.clone(),
            decoder.clone(),
            Arc::new(MockLookup::found()),
        ));

        let runner = {
            let session = session.clone();
            tokio::spawn(async move { session.run().await })
        };
        // Let the run task enter acquisition, then close mid-prompt
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.close();
        session.close();

        let result = runner.await.unwrap().unwrap();
        assert!(result.is_none());
        // The stream resolved after close and was released immediately
        assert!(camera.stream_stopped());
        assert!(decoder.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_scanning_releases_everything() {
        let camera = Arc::new(MockCamera::available());
        let decoder = Arc::new(MockDecoder::emitting(&[]));
        let session = Arc::new(session(
            camera.clone(),
            decoder.clone(),
            Arc::new(MockLookup::found()),
        ));

        let runner = {
            let session = session.clone();
            tokio::spawn(async move { session.run().await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(session.state(), ScanState::Scanning);

        session.close();
        session.close();

        let result = runner.await.unwrap().unwrap();
        assert!(result.is_none());
        assert!(camera.stream_stopped());
        assert!(decoder.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_resolving_discards_result() {
        let camera = Arc::new(MockCamera::available());
        let decoder = Arc::new(MockDecoder::emitting(&["9780131103627"]));
        let lookup = Arc::new(MockLookup::slow(Duration::from_secs(5)));
        let session = Arc::new(session(camera.clone(), decoder.clone(), lookup.clone()));

        let runner = {
            let session = session.clone();
            tokio::spawn(async move { session.run().await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(session.state(), ScanState::Resolving);

        session.close();
        session.close();

        let result = runner.await.unwrap().unwrap();
        assert!(result.is_none());
        assert!(camera.stream_stopped());
        assert!(decoder.is_stopped());
    }
}
