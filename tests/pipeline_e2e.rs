//! End-to-end pipeline tests with scripted collaborators.
//!
//! These run the full session lifecycle (capture, recognition, scheduling,
//! finalization) against the mock audio source and scripted recognizer, and
//! assert on the files a session leaves behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stenogram::audio::MockAudioSource;
use stenogram::config::{Config, SessionConfig};
use stenogram::error::StenogramError;
use stenogram::output::SessionMetadata;
use stenogram::pipeline::events::{CollectingSink, SessionEvent, ShutdownToken};
use stenogram::pipeline::{AudioBlock, BlockQueue};
use stenogram::session::{SessionContext, SessionManager, SessionOutcome};
use stenogram::stt::recognizer::RawHypothesis;
use stenogram::stt::ScriptedRecognizer;
use stenogram::summary::MockSummarizer;

/// Config with tiny blocks (4 samples) so a few mock chunks complete them.
fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config {
        session: SessionConfig {
            save_dir: dir.to_path_buf(),
        },
        ..Default::default()
    };
    config.audio.sample_rate = 8;
    config.audio.block_duration_ms = 500;
    config
}

struct Session {
    context: SessionContext,
    reporter: Arc<CollectingSink>,
    token: ShutdownToken,
}

impl Session {
    fn new(config: &Config, id: &str) -> Self {
        let context = SessionContext::create_named(config, id.to_string(), Utc::now())
            .expect("session folder");
        Self {
            context,
            reporter: Arc::new(CollectingSink::new()),
            token: ShutdownToken::new(),
        }
    }

    /// Runs a session, stopping it after `run_for`.
    fn run(
        &self,
        source: MockAudioSource,
        recognizer: ScriptedRecognizer,
        summarizer: MockSummarizer,
        run_for: Duration,
    ) -> Result<SessionOutcome, StenogramError> {
        let manager = SessionManager::new(
            self.context.clone(),
            self.token.clone(),
            self.reporter.clone(),
        );
        let handle = std::thread::spawn(move || {
            manager.run(Box::new(source), Box::new(recognizer), Arc::new(summarizer))
        });
        std::thread::sleep(run_for);
        self.token.request_stop();
        handle.join().expect("session thread")
    }
}

#[test]
fn test_partials_then_final_close_one_segment() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_refine");

    let source = MockAudioSource::new()
        .with_chunk(vec![1i16; 4])
        .with_chunk(vec![2i16; 4])
        .with_chunk(vec![3i16; 4]);
    let recognizer = ScriptedRecognizer::new()
        .then_partial("the quick")
        .then_partial("the quick brown")
        .then_final("the quick brown fox");

    let outcome = session
        .run(
            source,
            recognizer,
            MockSummarizer::new("a fox was quick"),
            Duration::from_millis(400),
        )
        .unwrap();

    // Partials refine in place; only the final text survives.
    assert_eq!(outcome.segments, 1);
    assert_eq!(outcome.words, 4);
    assert_eq!(outcome.blocks_captured, 3);
    assert_eq!(outcome.blocks_dropped, 0);

    let transcript = std::fs::read_to_string(&outcome.transcript_path).unwrap();
    assert!(transcript.contains("the quick brown fox"));
    assert!(
        !transcript.contains("the quick brown\n"),
        "intermediate partials never reach the transcript"
    );
    assert!(transcript.starts_with("Transcript: session_refine\n"));
    assert!(transcript.contains("[00:00:0"), "lines carry elapsed timestamps");
    assert!(transcript.contains("Segments: 1"));
    assert!(transcript.contains("Words: 4"));
}

#[test]
fn test_open_segment_is_force_closed_at_session_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_forced");

    let source = MockAudioSource::new().with_chunk(vec![1i16; 4]);
    let recognizer = ScriptedRecognizer::new().then_partial("unfinished thought");

    let outcome = session
        .run(
            source,
            recognizer,
            MockSummarizer::new("summary"),
            Duration::from_millis(300),
        )
        .unwrap();

    // The dangling partial becomes a synthetic final instead of being lost.
    assert_eq!(outcome.segments, 1);
    let transcript = std::fs::read_to_string(&outcome.transcript_path).unwrap();
    assert!(transcript.contains("unfinished thought"));
}

#[test]
fn test_block_read_during_shutdown_is_still_transcribed() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_late_block");

    // The second read is still in flight when the stop lands; its block is
    // pushed after the stop request and must survive the drain.
    let source = MockAudioSource::new()
        .with_chunk(vec![1i16; 4])
        .with_delayed_chunk(Duration::from_millis(600), vec![2i16; 4]);
    let recognizer = ScriptedRecognizer::new()
        .then_silence()
        .then_final("late words");

    let outcome = session
        .run(
            source,
            recognizer,
            MockSummarizer::new("summary"),
            Duration::from_millis(100),
        )
        .unwrap();

    assert_eq!(outcome.blocks_captured, 2);
    assert_eq!(outcome.blocks_dropped, 0);
    assert_eq!(outcome.segments, 1, "the block read during shutdown is decoded");

    let transcript = std::fs::read_to_string(&outcome.transcript_path).unwrap();
    assert!(transcript.contains("late words"));
}

#[test]
fn test_live_reporter_sees_partials_and_closed_segment_text() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_live");

    let source = MockAudioSource::new()
        .with_chunk(vec![1i16; 4])
        .with_chunk(vec![2i16; 4])
        .with_chunk(vec![3i16; 4]);
    let recognizer = ScriptedRecognizer::new()
        .then_partial("hello wor")
        .then_partial("hello world it")
        .then_final("hello world it is");

    session
        .run(
            source,
            recognizer,
            MockSummarizer::new("summary"),
            Duration::from_millis(400),
        )
        .unwrap();

    assert_eq!(
        session
            .reporter
            .count_matching(|e| matches!(e, SessionEvent::PartialHypothesis { .. })),
        2,
        "every partial refinement reaches the live reporter"
    );
    assert_eq!(
        session.reporter.count_matching(|e| matches!(
            e,
            SessionEvent::SegmentClosed { text, .. } if text == "hello world it is"
        )),
        1,
        "the closed segment is echoed with its full text"
    );
}

#[test]
fn test_recognizer_flush_text_reaches_the_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_flush");

    let source = MockAudioSource::new().with_chunk(vec![1i16; 4]);
    let recognizer = ScriptedRecognizer::new()
        .then_silence()
        .with_flush(RawHypothesis::Final("tail words".to_string()));

    let outcome = session
        .run(
            source,
            recognizer,
            MockSummarizer::new("summary"),
            Duration::from_millis(300),
        )
        .unwrap();

    assert_eq!(outcome.segments, 1);
    let transcript = std::fs::read_to_string(&outcome.transcript_path).unwrap();
    assert!(transcript.contains("tail words"));
}

#[test]
fn test_silent_session_skips_summary_but_keeps_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_silent");

    let source = MockAudioSource::new().with_repeated_chunk(vec![0i16; 4], 3);
    let recognizer = ScriptedRecognizer::new();

    let outcome = session
        .run(
            source,
            recognizer,
            MockSummarizer::new("never produced"),
            Duration::from_millis(300),
        )
        .unwrap();

    assert_eq!(outcome.segments, 0);
    assert!(
        outcome.summary_path.is_none(),
        "no summary file for an empty transcript"
    );
    assert!(!session.context.summary_path().exists());

    let transcript = std::fs::read_to_string(&outcome.transcript_path).unwrap();
    assert!(transcript.contains("Segments: 0"));
    assert_eq!(
        session.reporter.count_matching(|e| matches!(
            e,
            SessionEvent::SummarySkipped { .. }
        )),
        1,
        "the end-of-session cycle still runs and reports the skip"
    );
}

#[test]
fn test_metadata_describes_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_meta");

    let source = MockAudioSource::new()
        .with_chunk(vec![1i16; 4])
        .with_chunk(vec![2i16; 4]);
    let recognizer = ScriptedRecognizer::new()
        .then_partial("hello")
        .then_final("hello there");

    let outcome = session
        .run(
            source,
            recognizer,
            MockSummarizer::new("greeting"),
            Duration::from_millis(400),
        )
        .unwrap();

    let raw = std::fs::read_to_string(session.context.metadata_path()).unwrap();
    let metadata: SessionMetadata = serde_json::from_str(&raw).unwrap();

    assert_eq!(metadata.session_id, "session_meta");
    assert_eq!(metadata.sample_rate, 8);
    assert_eq!(metadata.channels, 1);
    assert_eq!(metadata.segments, 1);
    assert_eq!(metadata.words, 2);
    assert_eq!(metadata.blocks_captured, outcome.blocks_captured);
    assert_eq!(metadata.summary_mode, "mock");
    assert_eq!(metadata.transcript_file, "session_meta.txt");
    assert_eq!(metadata.summary_file.as_deref(), Some("session_meta_summary.txt"));
    assert_eq!(metadata.log_file, "session_meta_log.txt");
    assert_eq!(metadata.errors, 0);
}

#[test]
fn test_interval_and_final_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.summary.auto_summary_interval_seconds = 1;
    let session = Session::new(&config, "session_interval");

    let source = MockAudioSource::new().with_chunk(vec![1i16; 4]);
    let recognizer = ScriptedRecognizer::new().then_final("an early closed segment");

    let outcome = session
        .run(
            source,
            recognizer,
            MockSummarizer::new("checkpoint"),
            Duration::from_millis(1600),
        )
        .unwrap();

    let summary_path = outcome.summary_path.expect("summary file");
    let contents = std::fs::read_to_string(summary_path).unwrap();
    assert!(contents.contains("Interval summary"));
    assert!(contents.contains("Final summary"));
    let interval = contents.find("Interval summary").unwrap();
    let final_ = contents.find("Final summary").unwrap();
    assert!(interval < final_, "interval cycles precede the closing one");
}

#[test]
fn test_recognizer_failure_ends_the_session_fatally() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_decode_fail");

    let source = MockAudioSource::new()
        .with_chunk(vec![1i16; 4])
        .with_chunk(vec![2i16; 4]);
    let recognizer = ScriptedRecognizer::new()
        .then_final("kept text")
        .then_failure("decoder gone");

    let result = session.run(
        source,
        recognizer,
        MockSummarizer::new("summary"),
        Duration::from_millis(500),
    );

    assert!(matches!(
        result,
        Err(StenogramError::RecognitionUnavailable { .. })
    ));
    assert_eq!(
        session
            .reporter
            .count_matching(|e| matches!(e, SessionEvent::FatalError { .. })),
        1
    );

    // Everything transcribed before the failure is still persisted.
    let transcript = std::fs::read_to_string(session.context.transcript_path()).unwrap();
    assert!(transcript.contains("kept text"));
}

#[test]
fn test_stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Session::new(&config, "session_double_stop");

    let source = MockAudioSource::new().with_chunk(vec![1i16; 4]);
    let recognizer = ScriptedRecognizer::new().then_final("short");

    let manager = SessionManager::new(
        session.context.clone(),
        session.token.clone(),
        session.reporter.clone(),
    );
    let handle = std::thread::spawn(move || {
        manager.run(
            Box::new(source),
            Box::new(recognizer),
            Arc::new(MockSummarizer::new("summary")),
        )
    });

    std::thread::sleep(Duration::from_millis(300));
    assert!(session.token.request_stop(), "first stop initiates shutdown");
    assert!(!session.token.request_stop(), "second stop is a no-op");

    let outcome = handle.join().unwrap().unwrap();
    assert_eq!(outcome.segments, 1);
}

#[test]
fn test_full_queue_evicts_oldest_block() {
    let queue = BlockQueue::new(2);
    let now = Utc::now();

    assert!(queue.push(AudioBlock::new(vec![0; 4], 0, now)).is_none());
    assert!(queue.push(AudioBlock::new(vec![0; 4], 1, now)).is_none());

    // Third push evicts the oldest so the newest audio is always kept.
    assert_eq!(queue.push(AudioBlock::new(vec![0; 4], 2, now)), Some(0));
    assert_eq!(queue.dropped(), 1);

    let first = queue.try_pop().expect("block");
    assert_eq!(first.sequence, 1);
    let second = queue.try_pop().expect("block");
    assert_eq!(second.sequence, 2);
}
