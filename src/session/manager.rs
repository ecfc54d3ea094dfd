//! Session orchestration.
//!
//! `SessionManager::run` owns the session lifecycle: it spawns the capture,
//! recognition, and scheduler threads, waits for a stop request or a fatal
//! error, and then finalizes every output sink. Collaborators (audio source,
//! recognizer, summarizer) are injected, so the whole lifecycle runs under
//! test with mocks.

use crate::audio::{AudioSource, BlockAssembler, SessionWavWriter};
use crate::defaults;
use crate::error::{Result, StenogramError};
use crate::output::{SessionLog, SessionMetadata, SummaryWriter, TranscriptWriter};
use crate::pipeline::events::{
    EventSink, FanoutSink, SessionEvent, ShutdownToken, SummaryTrigger,
};
use crate::pipeline::{BlockQueue, RecognitionAdapter, SummaryScheduler};
use crate::session::context::SessionContext;
use crate::stt::recognizer::Recognizer;
use crate::summary::Summarizer;
use crate::transcript::{Segment, TranscriptAggregator};
use chrono::Utc;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Session lifecycle states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Validating,
    Running,
    Stopping,
    Finalizing,
    Closed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Validating => "Validating",
            LifecycleState::Running => "Running",
            LifecycleState::Stopping => "Stopping",
            LifecycleState::Finalizing => "Finalizing",
            LifecycleState::Closed => "Closed",
        }
    }
}

/// What a finished session produced.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: String,
    pub folder: PathBuf,
    pub transcript_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub segments: usize,
    pub words: usize,
    pub blocks_captured: u64,
    pub blocks_dropped: u64,
    pub duration_seconds: i64,
}

pub struct SessionManager {
    context: SessionContext,
    token: ShutdownToken,
    reporter: Arc<dyn EventSink>,
}

impl SessionManager {
    /// `reporter` receives events alongside the session log; the binary
    /// passes a stderr reporter, tests a collecting sink.
    pub fn new(context: SessionContext, token: ShutdownToken, reporter: Arc<dyn EventSink>) -> Self {
        Self {
            context,
            token,
            reporter,
        }
    }

    /// Runs the session until the shutdown token fires or a component fails
    /// fatally, then finalizes all output files.
    ///
    /// Returns the session outcome, or the fatal error after persisting
    /// whatever transcript existed at that point.
    pub fn run(
        self,
        source: Box<dyn AudioSource>,
        recognizer: Box<dyn Recognizer>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<SessionOutcome> {
        let config = self.context.config.clone();

        // Sinks first: the log joins the event fanout for the whole session.
        let log = Arc::new(SessionLog::create(&self.context.log_path())?);
        let events: Arc<dyn EventSink> = Arc::new(FanoutSink::new(vec![
            log.clone() as Arc<dyn EventSink>,
            self.reporter.clone(),
        ]));
        events.record(&SessionEvent::Lifecycle {
            state: LifecycleState::Validating.as_str(),
        });

        let wav = match SessionWavWriter::create(&self.context.audio_path(), config.audio.sample_rate)
        {
            Ok(writer) => Some(writer),
            Err(e) => {
                events.record(&SessionEvent::RecoverableError {
                    component: "audio archive",
                    message: e.to_string(),
                });
                None
            }
        };

        let queue = BlockQueue::new(config.audio.queue_capacity_blocks);
        let aggregator = Arc::new(Mutex::new(TranscriptAggregator::new()));
        let transcript = Arc::new(Mutex::new(TranscriptWriter::new(
            &self.context.transcript_path(),
            &self.context.session_id,
            self.context.started_at,
            events.clone(),
        )));
        let summary_writer = Arc::new(Mutex::new(SummaryWriter::new(
            &self.context.summary_path(),
            events.clone(),
        )));
        let scheduler = Arc::new(SummaryScheduler::new(
            aggregator.clone(),
            summarizer.clone(),
            summary_writer.clone(),
            events.clone(),
        ));

        let (fatal_tx, fatal_rx) = bounded::<(&'static str, StenogramError)>(4);
        let (scheduler_stop_tx, scheduler_stop_rx) = bounded::<()>(1);
        // Raised once capture has pushed its last block, so the recognition
        // drain never ends while blocks are still arriving.
        let capture_done = ShutdownToken::new();

        events.record(&SessionEvent::Lifecycle {
            state: LifecycleState::Running.as_str(),
        });

        let capture_handle = {
            let queue = queue.clone();
            let events = events.clone();
            let token = self.token.clone();
            let fatal_tx = fatal_tx.clone();
            let done = capture_done.clone();
            let block_samples = config.audio.block_samples();
            std::thread::spawn(move || {
                let result =
                    capture_loop(source, wav, block_samples, queue, events, token, fatal_tx);
                done.request_stop();
                result
            })
        };

        let recognition_handle = {
            let adapter = RecognitionAdapter::new(recognizer);
            let queue = queue.clone();
            let aggregator = aggregator.clone();
            let transcript = transcript.clone();
            let events = events.clone();
            let token = self.token.clone();
            let fatal_tx = fatal_tx.clone();
            let capture_done = capture_done.clone();
            std::thread::spawn(move || {
                recognition_loop(
                    adapter,
                    queue,
                    aggregator,
                    transcript,
                    events,
                    token,
                    capture_done,
                    fatal_tx,
                )
            })
        };

        let scheduler_handle = {
            let scheduler = scheduler.clone();
            let interval = config.auto_summary_interval();
            std::thread::spawn(move || scheduler.run(interval, scheduler_stop_rx))
        };
        drop(fatal_tx);

        // Wait for a stop request or the first fatal component error,
        // reporting progress at a fixed cadence.
        let mut fatal: Option<StenogramError> = None;
        let mut last_status = std::time::Instant::now();
        loop {
            match fatal_rx.recv_timeout(Duration::from_millis(50)) {
                Ok((component, error)) => {
                    events.record(&SessionEvent::FatalError {
                        component,
                        message: error.to_string(),
                    });
                    fatal = Some(error);
                    self.token.request_stop();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.token.is_stopped() {
                        break;
                    }
                    if last_status.elapsed().as_secs() >= defaults::STATUS_INTERVAL_SECS {
                        let segments = aggregator
                            .lock()
                            .map(|agg| agg.segment_count())
                            .unwrap_or(0);
                        events.record(&SessionEvent::Status {
                            elapsed_seconds: (Utc::now() - self.context.started_at)
                                .num_seconds()
                                .max(0) as u64,
                            segments,
                            dropped: queue.dropped(),
                        });
                        last_status = std::time::Instant::now();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        events.record(&SessionEvent::Lifecycle {
            state: LifecycleState::Stopping.as_str(),
        });
        self.token.request_stop();

        // Capture stops feeding; recognition drains the queue and flushes.
        let capture_result = capture_handle.join();
        // If capture panicked, its done flag was never raised; raise it here
        // so the recognition thread can still finish its drain.
        capture_done.request_stop();
        let (wav, blocks_captured) = capture_result
            .map_err(|_| StenogramError::Other("capture thread panicked".to_string()))?;
        recognition_handle
            .join()
            .map_err(|_| StenogramError::Other("recognition thread panicked".to_string()))?;
        let _ = scheduler_stop_tx.send(());
        scheduler_handle
            .join()
            .map_err(|_| StenogramError::Other("scheduler thread panicked".to_string()))?;

        // A fatal error raised during the drain still surfaces.
        if fatal.is_none() {
            if let Ok((component, error)) = fatal_rx.try_recv() {
                events.record(&SessionEvent::FatalError {
                    component,
                    message: error.to_string(),
                });
                fatal = Some(error);
            }
        }

        events.record(&SessionEvent::Lifecycle {
            state: LifecycleState::Finalizing.as_str(),
        });

        // Final summary over the complete transcript, best effort.
        scheduler.run_cycle(SummaryTrigger::SessionEnd);

        if let Some(wav) = wav {
            if let Err(e) = wav.finalize() {
                events.record(&SessionEvent::RecoverableError {
                    component: "audio archive",
                    message: e.to_string(),
                });
            }
        }

        let ended_at = Utc::now();
        let (segments, words) = match aggregator.lock() {
            Ok(aggregator) => (aggregator.segment_count(), aggregator.word_count()),
            Err(_) => (0, 0),
        };

        // The final transcript save is the one write that must succeed.
        let transcript_path = transcript
            .lock()
            .map_err(|_| StenogramError::Other("transcript lock poisoned".to_string()))?
            .finalize(ended_at, words)?;

        let summary_path = summary_writer
            .lock()
            .ok()
            .and_then(|writer| writer.written_path());

        let metadata = SessionMetadata {
            session_id: self.context.session_id.clone(),
            started_at: self.context.started_at,
            ended_at,
            duration_seconds: (ended_at - self.context.started_at).num_seconds(),
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            block_duration_ms: config.audio.block_duration_ms as u64,
            model_path: config.recognizer.model_path.display().to_string(),
            summary_mode: summarizer.mode().to_string(),
            transcript_file: SessionContext::file_name(&transcript_path),
            summary_file: summary_path.as_deref().map(SessionContext::file_name),
            audio_file: Some(SessionContext::file_name(&self.context.audio_path())),
            log_file: SessionContext::file_name(&self.context.log_path()),
            blocks_captured,
            blocks_dropped: queue.dropped(),
            segments,
            words,
            errors: log.error_count(),
        };
        if let Err(e) = metadata.write(&self.context.metadata_path()) {
            events.record(&SessionEvent::RecoverableError {
                component: "metadata",
                message: e.to_string(),
            });
        }

        events.record(&SessionEvent::Lifecycle {
            state: LifecycleState::Closed.as_str(),
        });
        log.flush();

        if let Some(error) = fatal {
            return Err(error);
        }

        Ok(SessionOutcome {
            session_id: self.context.session_id.clone(),
            folder: self.context.folder.clone(),
            transcript_path,
            summary_path,
            segments,
            words,
            blocks_captured,
            blocks_dropped: queue.dropped(),
            duration_seconds: (ended_at - self.context.started_at).num_seconds(),
        })
    }
}

/// Capture thread: poll the source, archive raw audio, assemble blocks, and
/// push them into the queue. Returns the WAV writer for finalization and the
/// number of blocks captured.
fn capture_loop(
    mut source: Box<dyn AudioSource>,
    mut wav: Option<SessionWavWriter>,
    block_samples: usize,
    queue: BlockQueue,
    events: Arc<dyn EventSink>,
    token: ShutdownToken,
    fatal_tx: Sender<(&'static str, StenogramError)>,
) -> (Option<SessionWavWriter>, u64) {
    if let Err(e) = source.start() {
        let _ = fatal_tx.send(("capture", e));
        token.request_stop();
        return (wav, 0);
    }

    let mut assembler = BlockAssembler::new(block_samples);
    let poll = Duration::from_millis(defaults::CAPTURE_POLL_INTERVAL_MS);

    while !token.is_stopped() {
        let samples = match source.read_samples() {
            Ok(samples) => samples,
            Err(e) => {
                let _ = fatal_tx.send(("capture", e));
                token.request_stop();
                break;
            }
        };
        if samples.is_empty() {
            std::thread::sleep(poll);
            continue;
        }

        if let Some(writer) = wav.as_mut() {
            if let Err(e) = writer.write_samples(&samples) {
                events.record(&SessionEvent::RecoverableError {
                    component: "audio archive",
                    message: e.to_string(),
                });
                // A sink that failed once stays off; transcription continues.
                wav = None;
            }
        }

        for block in assembler.push(&samples) {
            if let Some(sequence) = queue.push(block) {
                events.record(&SessionEvent::BlockDropped { sequence });
            }
        }
    }

    // The trailing sub-block remainder is discarded by design of the
    // assembler; only the stream needs explicit release.
    if let Err(e) = source.stop() {
        events.record(&SessionEvent::RecoverableError {
            component: "capture",
            message: e.to_string(),
        });
    }
    (wav, assembler.blocks_emitted())
}

/// Recognition thread: pop blocks, feed the recognizer, apply hypotheses to
/// the aggregator, and stream closed segments to the transcript sink. The
/// loop keeps popping until capture has signalled completion AND the queue is
/// drained, so a block pushed during shutdown is still decoded. Then it
/// flushes the recognizer and force-closes any open segment.
#[allow(clippy::too_many_arguments)]
fn recognition_loop(
    mut adapter: RecognitionAdapter,
    queue: BlockQueue,
    aggregator: Arc<Mutex<TranscriptAggregator>>,
    transcript: Arc<Mutex<TranscriptWriter>>,
    events: Arc<dyn EventSink>,
    token: ShutdownToken,
    capture_done: ShutdownToken,
    fatal_tx: Sender<(&'static str, StenogramError)>,
) {
    let pop_timeout = Duration::from_millis(defaults::QUEUE_POP_TIMEOUT_MS);

    loop {
        match queue.pop_timeout(pop_timeout) {
            Some(block) => {
                if !process_block(
                    &mut adapter,
                    &block,
                    &aggregator,
                    &transcript,
                    &events,
                    &token,
                    &fatal_tx,
                ) {
                    return;
                }
            }
            None => {
                // Capture raises its flag only after the last push, so this
                // exit cannot race a block still on its way in.
                if capture_done.is_stopped() && queue.is_empty() {
                    break;
                }
            }
        }
    }

    // Flush the recognizer's pending result, then force-close any segment
    // still open using its last partial as a synthetic final.
    match adapter.finalize() {
        Ok(Some(hypothesis)) => {
            apply_hypothesis(&hypothesis, &aggregator, &transcript, &events);
        }
        Ok(None) => {}
        Err(e) => {
            events.record(&SessionEvent::RecoverableError {
                component: "recognizer",
                message: e.to_string(),
            });
        }
    }

    let forced = aggregator.lock().ok().and_then(|mut agg| agg.force_close());
    if let Some(segment) = forced {
        record_segment(&segment, &transcript, &events);
    }
}

/// Feeds one block through the adapter. Returns false when the session must
/// stop because of a fatal recognizer error.
fn process_block(
    adapter: &mut RecognitionAdapter,
    block: &crate::pipeline::AudioBlock,
    aggregator: &Arc<Mutex<TranscriptAggregator>>,
    transcript: &Arc<Mutex<TranscriptWriter>>,
    events: &Arc<dyn EventSink>,
    token: &ShutdownToken,
    fatal_tx: &Sender<(&'static str, StenogramError)>,
) -> bool {
    match adapter.feed(block) {
        Ok(hypotheses) => {
            for hypothesis in &hypotheses {
                apply_hypothesis(hypothesis, aggregator, transcript, events);
            }
            true
        }
        Err(e) => {
            let _ = fatal_tx.send(("recognizer", e));
            token.request_stop();
            false
        }
    }
}

fn apply_hypothesis(
    hypothesis: &crate::pipeline::Hypothesis,
    aggregator: &Arc<Mutex<TranscriptAggregator>>,
    transcript: &Arc<Mutex<TranscriptWriter>>,
    events: &Arc<dyn EventSink>,
) {
    if !hypothesis.is_final() && !hypothesis.text.trim().is_empty() {
        events.record(&SessionEvent::PartialHypothesis {
            text: hypothesis.text.trim().to_string(),
        });
    }
    let closed = match aggregator.lock() {
        Ok(mut aggregator) => aggregator.apply(hypothesis),
        Err(_) => {
            events.record(&SessionEvent::RecoverableError {
                component: "aggregator",
                message: "transcript lock poisoned".to_string(),
            });
            return;
        }
    };
    if let Some(segment) = closed {
        record_segment(&segment, transcript, events);
    }
}

fn record_segment(
    segment: &Segment,
    transcript: &Arc<Mutex<TranscriptWriter>>,
    events: &Arc<dyn EventSink>,
) {
    events.record(&SessionEvent::SegmentClosed {
        index: segment.index,
        text: segment.text.clone(),
    });
    match transcript.lock() {
        Ok(mut writer) => {
            if let Err(e) = writer.append(segment) {
                events.record(&SessionEvent::RecoverableError {
                    component: "transcript",
                    message: e.to_string(),
                });
            }
        }
        Err(_) => {
            events.record(&SessionEvent::RecoverableError {
                component: "transcript",
                message: "transcript lock poisoned".to_string(),
            });
        }
    }
}
