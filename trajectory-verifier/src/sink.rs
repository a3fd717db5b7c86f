//! Verdict sinks: where the engine hands every executed test's outcome.
//!
//! The engine never waits on a sink. Delivery is fire-and-forget.

use flight_test_types::Verdict;
use tokio::sync::mpsc;
use tracing::warn;

pub trait VerdictSink {
    fn publish(&mut self, verdict: Verdict);

    /// Verdicts that never reached their destination.
    fn dropped(&self) -> usize {
        0
    }
}

/// Collects verdicts in memory.
impl VerdictSink for Vec<Verdict> {
    fn publish(&mut self, verdict: Verdict) {
        self.push(verdict);
    }
}

/// Forwards verdicts to the report task.
/// Size the channel with `MissionModel::max_verdicts` so a slow report task
/// never causes a drop.
pub struct ChannelSink {
    tx: mpsc::Sender<Verdict>,
    dropped: usize,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Verdict>) -> Self {
        Self { tx, dropped: 0 }
    }
}

impl VerdictSink for ChannelSink {
    fn publish(&mut self, verdict: Verdict) {
        if let Err(e) = self.tx.try_send(verdict) {
            self.dropped += 1;
            warn!("Verdict dropped, report channel unavailable: {e}");
        }
    }

    fn dropped(&self) -> usize {
        self.dropped
    }
}
