//! `parallel` — generic fan-in over concurrent producers.
//!
//! Each producer runs on the shared rayon pool (sized to the host's
//! parallelism) and writes to its own bounded channel; a forwarder per
//! producer merges those into one collection channel that a collector
//! drains into the final output. The merge order is whatever scheduling
//! produces — callers must not rely on it.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Default producer/collector channel bound; a performance knob more than a
/// correctness one.
const CHANNEL_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct Timing {
    start: Option<Instant>,
    end: Option<Instant>,
}

/// A group of producer instances fanned into one collected output.
pub struct Group<T, O> {
    method: fn(T, SyncSender<O>),
    instances: Vec<T>,
    buffer: usize,
    timing: Arc<Mutex<Timing>>,
    result_rx: Option<Receiver<Vec<O>>>,
    output: Option<Vec<O>>,
}

impl<T: Send + 'static, O: Send + 'static> Group<T, O> {
    #[must_use]
    pub fn new(method: fn(T, SyncSender<O>), instances: Vec<T>) -> Self {
        Self {
            method,
            instances,
            buffer: CHANNEL_CAPACITY,
            timing: Arc::new(Mutex::new(Timing::default())),
            result_rx: None,
            output: None,
        }
    }

    /// Override the channel capacity.
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Start every producer and the collector. Non-blocking.
    pub fn run(&mut self) {
        let (result_tx, result_rx) = sync_channel(1);
        let (collection_tx, collection_rx) = sync_channel(self.buffer);

        let mut forwarders = Vec::with_capacity(self.instances.len());
        for instance in self.instances.drain(..) {
            let (tx, rx) = sync_channel(self.buffer);
            let method = self.method;
            rayon::spawn(move || method(instance, tx));

            let merge_tx = collection_tx.clone();
            forwarders.push(thread::spawn(move || {
                for item in rx {
                    if merge_tx.send(item).is_err() {
                        return;
                    }
                }
            }));
        }

        // collector: drain the merged stream into one vector
        thread::spawn(move || {
            let output: Vec<O> = collection_rx.iter().collect();
            let _ = result_tx.send(output);
        });

        // waiter: once every producer has closed, stamp the end time and
        // close the collection channel so the collector can finish
        let timing = Arc::clone(&self.timing);
        thread::spawn(move || {
            for forwarder in forwarders {
                let _ = forwarder.join();
            }
            if let Ok(mut t) = timing.lock() {
                t.end = Some(Instant::now());
            }
            drop(collection_tx);
        });

        if let Ok(mut t) = self.timing.lock() {
            t.start = Some(Instant::now());
            t.end = None;
        }
        self.result_rx = Some(result_rx);
    }

    /// Block until every producer has closed its channel and the collector
    /// drained them, then return the concatenated output. Order across
    /// producers is unspecified.
    pub fn output(&mut self) -> &[O] {
        if self.output.is_none() {
            let received = self
                .result_rx
                .take()
                .and_then(|rx| rx.recv().ok())
                .unwrap_or_default();
            self.output = Some(received);
        }
        self.output.as_deref().unwrap_or(&[])
    }

    /// Wall clock from producer start to the close of the last producer;
    /// zero until finalised.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self.timing.lock() {
            Ok(t) => match (t.start, t.end) {
                (Some(start), Some(end)) => end.duration_since(start),
                _ => Duration::ZERO,
            },
            Err(_) => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Range;

    fn emit_range(range: Range<usize>, out: SyncSender<usize>) {
        for value in range {
            if out.send(value).is_err() {
                return;
            }
        }
    }

    fn sleepy_emit(range: Range<usize>, out: SyncSender<usize>) {
        thread::sleep(Duration::from_millis(30));
        emit_range(range, out);
    }

    #[test]
    fn test_single_producer_collects_everything() {
        let mut group = Group::new(emit_range, vec![0..10]);
        group.run();
        let mut got = group.output().to_vec();
        got.sort_unstable();
        assert_eq!(got, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_two_producers_merge_without_loss() {
        let mut group = Group::new(emit_range, vec![0..5, 5..10]);
        group.run();
        let mut got = group.output().to_vec();
        got.sort_unstable();
        assert_eq!(got, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_small_buffer_backpressure_loses_nothing() {
        let mut group = Group::new(emit_range, vec![0..500, 500..1000]).with_buffer(2);
        group.run();
        let mut got = group.output().to_vec();
        got.sort_unstable();
        assert_eq!(got.len(), 1000);
        assert_eq!(got, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_duration_zero_until_finalised_then_covers_producers() {
        let mut group = Group::new(sleepy_emit, vec![0..3, 3..6]);
        assert_eq!(group.duration(), Duration::ZERO);
        group.run();
        let got = group.output().len();
        assert_eq!(got, 6);
        assert!(group.duration() >= Duration::from_millis(30));
    }

    #[test]
    fn test_output_without_run_is_empty() {
        let mut group: Group<Range<usize>, usize> = Group::new(emit_range, vec![]);
        assert!(group.output().is_empty());
    }

    #[test]
    fn test_repeated_output_returns_same_slice() {
        let mut group = Group::new(emit_range, vec![0..4]);
        group.run();
        let first = group.output().len();
        let second = group.output().len();
        assert_eq!(first, second);
    }
}
