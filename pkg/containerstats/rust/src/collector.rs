// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Fixed-cadence collection loop.
//!
//! One tick is {sample, append}; the wait between ticks is the only point
//! where a stop request is observed mid-flight, so a sample that has been
//! taken is always appended in full before the loop stops.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, trace, warn};

use crate::errors::{Error, Result};
use crate::record::SampleSink;
use crate::sampler::{Sampler, StatsQuery};
use crate::state::LoopState;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A stop was requested on the shutdown channel (or its sender went away).
    Interrupted,
    /// The stats query failed; the container is gone or was never there.
    QueryFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Ticks started, including skipped and failed ones.
    pub ticks: u64,
    pub samples_written: u64,
    pub ticks_skipped: u64,
    pub stop_reason: StopReason,
}

impl CollectionSummary {
    /// True when the very first query failed, i.e. the identifier never resolved.
    pub fn never_resolved(&self) -> bool {
        self.ticks == 1 && matches!(self.stop_reason, StopReason::QueryFailed { .. })
    }
}

pub struct CollectionLoop<Q, S> {
    sampler: Sampler<Q>,
    sink: S,
    interval: Duration,
    state: LoopState,
    ticks: u64,
    samples_written: u64,
    ticks_skipped: u64,
}

impl<Q: StatsQuery, S: SampleSink> CollectionLoop<Q, S> {
    pub fn new(sampler: Sampler<Q>, sink: S, interval: Duration) -> Self {
        Self {
            sampler,
            sink,
            interval,
            state: LoopState::Idle,
            ticks: 0,
            samples_written: 0,
            ticks_skipped: 0,
        }
    }

    /// Sample `container_id` every interval until `shutdown` turns true or the
    /// query fails permanently. The sink is flushed before returning, on every
    /// path.
    pub async fn run(
        mut self,
        container_id: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<CollectionSummary> {
        info!(
            container = container_id,
            interval = ?self.interval,
            "starting collection"
        );

        let outcome = self.collect(container_id, &mut shutdown).await;
        let flushed = self.stop();

        let stop_reason = outcome?;
        flushed?;

        let summary = CollectionSummary {
            ticks: self.ticks,
            samples_written: self.samples_written,
            ticks_skipped: self.ticks_skipped,
            stop_reason,
        };
        info!(
            container = container_id,
            ticks = summary.ticks,
            samples_written = summary.samples_written,
            ticks_skipped = summary.ticks_skipped,
            "collection stopped"
        );
        Ok(summary)
    }

    async fn collect(
        &mut self,
        container_id: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StopReason> {
        loop {
            if *shutdown.borrow() {
                return Ok(StopReason::Interrupted);
            }

            let tick_started = Instant::now();
            self.ticks += 1;
            self.transition(LoopState::Sampling);

            match self.sampler.sample(container_id).await {
                Ok(sample) => {
                    self.transition(LoopState::Persisting);
                    self.sink.append(&sample)?;
                    self.samples_written += 1;
                    self.transition(LoopState::Idle);
                }
                Err(Error::QueryFailed { reason, .. }) => {
                    error!(container = container_id, %reason, "stats query failed");
                    return Ok(StopReason::QueryFailed { reason });
                }
                Err(e) => {
                    self.ticks_skipped += 1;
                    warn!(
                        container = container_id,
                        error = %e,
                        skipped = self.ticks_skipped,
                        "skipping tick"
                    );
                    self.transition(LoopState::Idle);
                }
            }

            let deadline = tick_started + self.interval;
            loop {
                tokio::select! {
                    _ = sleep_until(deadline) => break,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("stop requested while waiting for next tick");
                            return Ok(StopReason::Interrupted);
                        }
                    }
                }
            }
        }
    }

    /// Move to Stopped and flush the sink; a second call is a no-op.
    fn stop(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.transition(LoopState::Stopped);
        self.sink.flush()
    }

    fn transition(&mut self, next: LoopState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid loop transition {} -> {next}",
            self.state
        );
        trace!(from = %self.state, to = %next, "loop state");
        self.state = next;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::sample::Sample;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn line(memory: &str) -> String {
        format!(
            r#"{{"CPUPerc":"1.00%","MemUsage":"{memory} / 2GiB","MemPerc":"5.00%","BlockIO":"0B / 0B"}}"#
        )
    }

    /// Replays canned outputs; `None` or running out behaves like a missing container.
    struct Scripted {
        responses: Mutex<VecDeque<Option<String>>>,
        stop_on_query: Option<watch::Sender<bool>>,
    }

    impl Scripted {
        fn new(responses: Vec<Option<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                stop_on_query: None,
            }
        }
    }

    impl StatsQuery for Scripted {
        async fn query(&self, container_id: &str) -> Result<String> {
            if let Some(tx) = &self.stop_on_query {
                let _ = tx.send(true);
            }
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Some(out)) => Ok(out),
                _ => Err(Error::QueryFailed {
                    container: container_id.to_string(),
                    reason: format!("No such container: {container_id}"),
                }),
            }
        }
    }

    #[derive(Default)]
    struct CountingSink {
        samples: Vec<Sample>,
        flushes: usize,
        fail_appends: bool,
    }

    impl SampleSink for CountingSink {
        fn append(&mut self, sample: &Sample) -> Result<()> {
            if self.fail_appends {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.samples.push(sample.clone());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_malformed_tick_is_skipped() {
        let query = Scripted::new(vec![
            Some(line("100B")),
            Some(r#"{"CPUPerc":"--","MemUsage":"0B / 0B","MemPerc":"--","BlockIO":"--"}"#.into()),
            Some(line("300B")),
        ]);
        let mut record = Record::new();
        let (_tx, rx) = watch::channel(false);

        let summary = CollectionLoop::new(Sampler::new(query), &mut record, Duration::ZERO)
            .run("web", rx)
            .await
            .unwrap();

        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.samples_written, 2);
        assert_eq!(summary.ticks_skipped, 1);
        assert!(matches!(summary.stop_reason, StopReason::QueryFailed { .. }));
        assert!(!summary.never_resolved());

        let memory: Vec<f64> = record.samples().iter().map(|s| s.memory_used_bytes).collect();
        assert_eq!(memory, vec![100.0, 300.0]);
    }

    #[tokio::test]
    async fn test_unknown_container_stops_on_first_tick() {
        let mut sink = CountingSink::default();
        let (_tx, rx) = watch::channel(false);

        let summary = CollectionLoop::new(
            Sampler::new(Scripted::new(vec![])),
            &mut sink,
            Duration::from_secs(60),
        )
        .run("ghost", rx)
        .await
        .unwrap();

        assert!(summary.never_resolved());
        assert_eq!(summary.samples_written, 0);
        assert_eq!(
            summary.stop_reason,
            StopReason::QueryFailed {
                reason: "No such container: ghost".into()
            }
        );
        assert_eq!(sink.flushes, 1, "final flush on stop");
    }

    #[tokio::test]
    async fn test_interrupt_mid_wait_stops_promptly() {
        let query = Scripted::new(vec![Some(line("1MiB")), Some(line("2MiB"))]);
        let mut sink = CountingSink::default();
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(true).unwrap();
        });

        let started = std::time::Instant::now();
        let summary = tokio::time::timeout(
            Duration::from_secs(10),
            CollectionLoop::new(Sampler::new(query), &mut sink, Duration::from_secs(60))
                .run("web", rx),
        )
        .await
        .expect("loop must stop within one interval")
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert_eq!(summary.samples_written, 1);
        assert_eq!(sink.samples.len(), 1);
        assert_eq!(sink.flushes, 1);
    }

    #[tokio::test]
    async fn test_stop_during_sampling_finishes_append() {
        let (tx, rx) = watch::channel(false);
        let mut query = Scripted::new(vec![Some(line("1MiB")), Some(line("2MiB"))]);
        query.stop_on_query = Some(tx);
        let mut sink = CountingSink::default();

        let summary = CollectionLoop::new(Sampler::new(query), &mut sink, Duration::from_secs(60))
            .run("web", rx)
            .await
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert_eq!(summary.ticks, 1);
        assert_eq!(sink.samples.len(), 1, "in-flight sample is persisted");
    }

    #[tokio::test]
    async fn test_already_stopped_takes_no_sample() {
        let (_tx, rx) = watch::channel(true);
        let mut sink = CountingSink::default();

        let summary = CollectionLoop::new(
            Sampler::new(Scripted::new(vec![Some(line("1MiB"))])),
            &mut sink,
            DEFAULT_INTERVAL,
        )
        .run("web", rx)
        .await
        .unwrap();

        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert_eq!(sink.flushes, 1);
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_loop() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let mut sink = CountingSink::default();

        let summary = CollectionLoop::new(
            Sampler::new(Scripted::new(vec![Some(line("1MiB"))])),
            &mut sink,
            Duration::from_secs(60),
        )
        .run("web", rx)
        .await
        .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert_eq!(summary.samples_written, 1);
    }

    #[tokio::test]
    async fn test_sink_failure_is_fatal_but_flushes() {
        let mut sink = CountingSink {
            fail_appends: true,
            ..Default::default()
        };
        let (_tx, rx) = watch::channel(false);

        let err = CollectionLoop::new(
            Sampler::new(Scripted::new(vec![Some(line("1MiB"))])),
            &mut sink,
            Duration::ZERO,
        )
        .run("web", rx)
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn test_stop_flushes_once() {
        let mut sink = CountingSink::default();
        let mut collection = CollectionLoop::new(
            Sampler::new(Scripted::new(vec![])),
            &mut sink,
            DEFAULT_INTERVAL,
        );

        collection.stop().unwrap();
        collection.stop().unwrap();
        assert!(collection.state.is_terminal());
        drop(collection);
        assert_eq!(sink.flushes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_time_is_subtracted_from_wait() {
        let query = Scripted::new(vec![Some(line("1MiB")), Some(line("2MiB")), Some(line("3MiB"))]);
        let mut record = Record::new();
        let (_tx, rx) = watch::channel(false);

        let started = Instant::now();
        let summary = CollectionLoop::new(Sampler::new(query), &mut record, Duration::from_secs(5))
            .run("web", rx)
            .await
            .unwrap();

        // three samples, one failed query; ticks start at 0s, 5s, 10s, 15s
        assert_eq!(summary.samples_written, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }
}
