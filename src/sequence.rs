//! Ordering and gap detection over producer sequence numbers.
//!
//! `sequenceNo` increases by one per emission and eventually wraps. Comparison
//! uses the half-range rule, so a counter that wrapped from `u32::MAX` to `0`
//! is still in order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::packets::Packet;
use crate::types::seq_after_u32;

/// Classification of one observed sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceEvent {
    /// First value seen
    First,
    /// Exactly one after the previous value
    InOrder,
    /// Newer than expected; `missed` values were skipped
    Gap { missed: u32 },
    /// Same as the previous value
    Duplicate,
    /// Older than the previous value; ignored
    Stale,
}

/// Running counts per event type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStats {
    pub received: u64,
    pub in_order: u64,
    pub gaps: u64,
    pub missed: u64,
    pub duplicates: u64,
    pub stale: u64,
}

/// Tracks one producer's sequence counter.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last: Option<u32>,
    stats: SequenceStats,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sequence_no` and classify it against the newest value so far.
    pub fn observe(&mut self, sequence_no: u32) -> SequenceEvent {
        self.stats.received += 1;

        let event = match self.last {
            None => SequenceEvent::First,
            Some(last) if last == sequence_no => SequenceEvent::Duplicate,
            Some(last) if seq_after_u32(sequence_no, last) => match sequence_no.wrapping_sub(last) {
                1 => SequenceEvent::InOrder,
                step => SequenceEvent::Gap { missed: step - 1 },
            },
            Some(_) => SequenceEvent::Stale,
        };

        match event {
            SequenceEvent::First => {}
            SequenceEvent::InOrder => self.stats.in_order += 1,
            SequenceEvent::Gap { missed } => {
                self.stats.gaps += 1;
                self.stats.missed += u64::from(missed);
            }
            SequenceEvent::Duplicate => self.stats.duplicates += 1,
            SequenceEvent::Stale => self.stats.stale += 1,
        }

        if matches!(event, SequenceEvent::First | SequenceEvent::InOrder | SequenceEvent::Gap { .. }) {
            self.last = Some(sequence_no);
        }

        event
    }

    /// Newest sequence number accepted so far.
    pub fn last(&self) -> Option<u32> {
        self.last
    }

    pub fn stats(&self) -> SequenceStats {
        self.stats
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One [`SequenceTracker`] per packet type.
#[derive(Debug, Clone, Default)]
pub struct SequenceMonitor {
    trackers: HashMap<String, SequenceTracker>,
}

impl SequenceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a decoded packet. Returns `None` for packets without a `sequenceNo` field.
    pub fn observe(&mut self, packet: &Packet) -> Option<SequenceEvent> {
        let sequence_no = packet.sequence_no()?;
        let name = packet.name();

        let event = self.trackers.entry(name.to_string()).or_default().observe(sequence_no);

        match event {
            SequenceEvent::Gap { missed } => {
                warn!(packet = name, sequence_no, missed, "Sequence gap detected");
            }
            SequenceEvent::Duplicate | SequenceEvent::Stale => {
                trace!(packet = name, sequence_no, event = ?event, "Out of order packet");
            }
            SequenceEvent::First | SequenceEvent::InOrder => {}
        }

        Some(event)
    }

    pub fn tracker(&self, packet: &str) -> Option<&SequenceTracker> {
        self.trackers.get(packet)
    }

    /// Stats for every packet type seen so far.
    pub fn stats(&self) -> impl Iterator<Item = (&str, SequenceStats)> {
        self.trackers.iter().map(|(name, tracker)| (name.as_str(), tracker.stats()))
    }
}
