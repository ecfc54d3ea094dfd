//! Interval-driven summarization.
//!
//! The scheduler runs on its own thread, waking on a ticker when auto
//! summaries are enabled and otherwise sleeping until the stop signal. A
//! cycle snapshots the transcript, summarizes the closed text, and appends
//! the result to the summary sink. No failure in a cycle ever ends the
//! session; skipped cycles become events.

use crate::output::SummaryWriter;
use crate::pipeline::events::{EventSink, SessionEvent, SummaryTrigger};
use crate::summary::Summarizer;
use crate::transcript::TranscriptAggregator;
use chrono::Utc;
use crossbeam_channel::{never, select, tick, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct SummaryScheduler {
    aggregator: Arc<Mutex<TranscriptAggregator>>,
    summarizer: Arc<dyn Summarizer>,
    writer: Arc<Mutex<SummaryWriter>>,
    events: Arc<dyn EventSink>,
}

impl SummaryScheduler {
    pub fn new(
        aggregator: Arc<Mutex<TranscriptAggregator>>,
        summarizer: Arc<dyn Summarizer>,
        writer: Arc<Mutex<SummaryWriter>>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            aggregator,
            summarizer,
            writer,
            events,
        }
    }

    /// Blocks until `stop` fires, running one cycle per interval tick.
    ///
    /// `interval` of `None` disables auto summaries; the thread then only
    /// waits for the stop signal.
    pub fn run(&self, interval: Option<Duration>, stop: Receiver<()>) {
        let ticker = match interval {
            Some(duration) => tick(duration),
            None => never(),
        };

        loop {
            select! {
                recv(ticker) -> _ => self.run_cycle(SummaryTrigger::Interval),
                recv(stop) -> _ => break,
            }
        }
    }

    /// One summarization cycle. The aggregator lock is held only for the
    /// snapshot, never across summarization.
    pub fn run_cycle(&self, trigger: SummaryTrigger) {
        let closed_text = match self.aggregator.lock() {
            Ok(aggregator) => aggregator.snapshot().closed_text(),
            Err(_) => {
                self.events.record(&SessionEvent::RecoverableError {
                    component: "scheduler",
                    message: "transcript lock poisoned".to_string(),
                });
                return;
            }
        };

        if closed_text.trim().is_empty() {
            self.events.record(&SessionEvent::SummarySkipped {
                trigger,
                reason: "transcript is empty".to_string(),
            });
            return;
        }

        let summary = match self.summarizer.summarize(&closed_text) {
            Ok(summary) => summary,
            Err(e) => {
                self.events.record(&SessionEvent::SummarySkipped {
                    trigger,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let write_result = match self.writer.lock() {
            Ok(mut writer) => writer.append(trigger, Utc::now(), &summary),
            Err(_) => {
                self.events.record(&SessionEvent::RecoverableError {
                    component: "scheduler",
                    message: "summary sink lock poisoned".to_string(),
                });
                return;
            }
        };

        match write_result {
            Ok(()) => self.events.record(&SessionEvent::SummaryWritten {
                trigger,
                chars: summary.chars().count(),
            }),
            Err(e) => self.events.record(&SessionEvent::RecoverableError {
                component: "summary writer",
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::events::CollectingSink;
    use crate::pipeline::types::Hypothesis;
    use crate::summary::MockSummarizer;
    use crossbeam_channel::bounded;

    struct Fixture {
        scheduler: SummaryScheduler,
        summarizer: Arc<MockSummarizer>,
        events: Arc<CollectingSink>,
        _dir: tempfile::TempDir,
    }

    fn fixture(summarizer: MockSummarizer, segments: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let events: Arc<CollectingSink> = Arc::new(CollectingSink::new());

        let mut aggregator = TranscriptAggregator::new();
        for (i, text) in segments.iter().enumerate() {
            aggregator.apply(&Hypothesis::final_(*text, i as u64));
        }

        let summarizer = Arc::new(summarizer);
        let writer = Arc::new(Mutex::new(SummaryWriter::new(
            &dir.path().join("summary.txt"),
            events.clone(),
        )));
        let scheduler = SummaryScheduler::new(
            Arc::new(Mutex::new(aggregator)),
            summarizer.clone(),
            writer,
            events.clone(),
        );
        Fixture {
            scheduler,
            summarizer,
            events,
            _dir: dir,
        }
    }

    #[test]
    fn test_cycle_summarizes_concatenated_closed_text_once() {
        let fx = fixture(
            MockSummarizer::new("the summary"),
            &["first segment", "second segment"],
        );

        fx.scheduler.run_cycle(SummaryTrigger::Interval);

        assert_eq!(
            fx.summarizer.calls(),
            vec!["first segment second segment".to_string()],
            "one cycle means exactly one summarizer invocation"
        );
        assert_eq!(
            fx.events
                .count_matching(|e| matches!(e, SessionEvent::SummaryWritten { .. })),
            1
        );
    }

    #[test]
    fn test_empty_transcript_skips_without_invoking_summarizer() {
        let fx = fixture(MockSummarizer::new("unused"), &[]);

        fx.scheduler.run_cycle(SummaryTrigger::Interval);

        assert!(fx.summarizer.calls().is_empty());
        assert_eq!(
            fx.events
                .count_matching(|e| matches!(e, SessionEvent::SummarySkipped { .. })),
            1
        );
    }

    #[test]
    fn test_failed_cycle_is_skipped_and_later_cycles_still_run() {
        let fx = fixture(MockSummarizer::failing(), &["some closed segment text"]);

        fx.scheduler.run_cycle(SummaryTrigger::Interval);
        fx.scheduler.run_cycle(SummaryTrigger::SessionEnd);

        assert_eq!(fx.summarizer.calls().len(), 2, "a failure never stops later cycles");
        assert_eq!(
            fx.events
                .count_matching(|e| matches!(e, SessionEvent::SummarySkipped { .. })),
            2
        );
        assert_eq!(
            fx.events
                .count_matching(|e| matches!(e, SessionEvent::SummaryWritten { .. })),
            0
        );
    }

    #[test]
    fn test_run_ticks_until_stopped() {
        let fx = fixture(MockSummarizer::new("tick summary"), &["enough text to summarize"]);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        std::thread::scope(|scope| {
            let scheduler = &fx.scheduler;
            scope.spawn(move || {
                scheduler.run(Some(Duration::from_millis(20)), stop_rx);
            });
            std::thread::sleep(Duration::from_millis(110));
            stop_tx.send(()).unwrap();
        });

        let calls = fx.summarizer.calls().len();
        assert!(calls >= 2, "expected repeated interval cycles, got {calls}");
    }

    #[test]
    fn test_run_without_interval_only_waits_for_stop() {
        let fx = fixture(MockSummarizer::new("unused"), &["closed text"]);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        std::thread::scope(|scope| {
            let scheduler = &fx.scheduler;
            scope.spawn(move || {
                scheduler.run(None, stop_rx);
            });
            std::thread::sleep(Duration::from_millis(60));
            stop_tx.send(()).unwrap();
        });

        assert!(fx.summarizer.calls().is_empty(), "disabled interval never summarizes");
    }
}
