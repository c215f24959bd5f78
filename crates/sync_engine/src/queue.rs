//! Per-producer FIFO
//!
//! Producer callbacks push onto an unbounded channel from their own threads.
//! The control thread pops in identifier order: older frames are stale,
//! newer frames are held back for a later step.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use contracts::{FrameId, FramePacket, PacketCallback};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace};

/// Counters gathered while popping one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PopCounters {
    pub stale: u32,
    pub duplicates: u32,
    pub held_back: u32,
}

pub(crate) struct ProducerQueue {
    producer_id: String,
    tx: Sender<FramePacket>,
    rx: Receiver<FramePacket>,
    /// Payloads for frames after the one last requested, in arrival order
    held: VecDeque<FramePacket>,
}

impl ProducerQueue {
    pub fn new(producer_id: impl Into<String>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            producer_id: producer_id.into(),
            tx,
            rx,
            held: VecDeque::new(),
        }
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    /// Callback that enqueues every delivered payload
    pub fn callback(&self) -> PacketCallback {
        let tx = self.tx.clone();
        Arc::new(move |packet| {
            // Receiver lives as long as the queue; a failed send means the
            // synchronizer is gone and the payload has nowhere to go.
            let _ = tx.send(packet);
        })
    }

    /// Payloads waiting in the channel or held back
    pub fn depth(&self) -> usize {
        self.rx.len() + self.held.len()
    }

    /// Pop the payload tagged `frame_id`, waiting until `deadline`
    ///
    /// Already-queued duplicates of the frame are drained after the match.
    /// Returns `None` if the deadline passed without a match.
    pub fn pop_frame(
        &mut self,
        frame_id: FrameId,
        deadline: Instant,
        counters: &mut PopCounters,
    ) -> Option<FramePacket> {
        let mut matched = self.take_held(frame_id, counters);

        while matched.is_none() {
            match self.rx.recv_deadline(deadline) {
                Ok(packet) => matched = self.classify(packet, frame_id, counters),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }

        // Drain what is already queued without blocking
        while let Ok(packet) = self.rx.try_recv() {
            if self.classify(packet, frame_id, counters).is_some() {
                counters.duplicates += 1;
            }
        }

        if counters.duplicates > 0 {
            debug!(
                producer = %self.producer_id,
                frame_id,
                duplicates = counters.duplicates,
                "drained duplicate payloads"
            );
        }

        matched
    }

    /// Resolve held-back payloads against the requested frame
    fn take_held(&mut self, frame_id: FrameId, counters: &mut PopCounters) -> Option<FramePacket> {
        let mut matched = None;
        let mut kept = VecDeque::with_capacity(self.held.len());

        for packet in self.held.drain(..) {
            match packet.frame_id.cmp(&frame_id) {
                Ordering::Less => counters.stale += 1,
                Ordering::Equal if matched.is_none() => matched = Some(packet),
                Ordering::Equal => counters.duplicates += 1,
                Ordering::Greater => kept.push_back(packet),
            }
        }

        self.held = kept;
        matched
    }

    /// Sort one received payload; returns it only if it matches `frame_id`
    fn classify(
        &mut self,
        packet: FramePacket,
        frame_id: FrameId,
        counters: &mut PopCounters,
    ) -> Option<FramePacket> {
        match packet.frame_id.cmp(&frame_id) {
            Ordering::Less => {
                counters.stale += 1;
                debug!(
                    producer = %self.producer_id,
                    stale_frame = packet.frame_id,
                    frame_id,
                    "discarding stale payload"
                );
                None
            }
            Ordering::Equal => Some(packet),
            Ordering::Greater => {
                counters.held_back += 1;
                trace!(
                    producer = %self.producer_id,
                    future_frame = packet.frame_id,
                    frame_id,
                    "holding back payload"
                );
                self.held.push_back(packet);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FramePayload, WorldSnapshot};
    use std::time::Duration;

    fn packet(frame_id: FrameId) -> FramePacket {
        FramePacket {
            producer_id: "cam".to_string(),
            frame_id,
            timestamp: 0.0,
            payload: FramePayload::Tick(WorldSnapshot {
                frame_id,
                ..Default::default()
            }),
        }
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_millis(20)
    }

    #[test]
    fn test_stale_skipped_and_duplicates_drained() {
        let mut queue = ProducerQueue::new("cam");
        let callback = queue.callback();
        for frame in [5, 7, 7] {
            callback(packet(frame));
        }

        let mut counters = PopCounters::default();
        let matched = queue.pop_frame(7, soon(), &mut counters).unwrap();
        assert_eq!(matched.frame_id, 7);
        assert_eq!(
            counters,
            PopCounters {
                stale: 1,
                duplicates: 1,
                held_back: 0
            }
        );
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn test_future_held_for_next_frame() {
        let mut queue = ProducerQueue::new("cam");
        let callback = queue.callback();
        callback(packet(3));
        callback(packet(2));

        let mut counters = PopCounters::default();
        assert_eq!(queue.pop_frame(2, soon(), &mut counters).unwrap().frame_id, 2);
        assert_eq!(counters.held_back, 1);
        assert_eq!(queue.depth(), 1);

        let mut counters = PopCounters::default();
        assert_eq!(queue.pop_frame(3, soon(), &mut counters).unwrap().frame_id, 3);
        assert_eq!(counters, PopCounters::default());
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn test_times_out_without_match() {
        let mut queue = ProducerQueue::new("cam");
        queue.callback()(packet(1));

        let mut counters = PopCounters::default();
        let started = Instant::now();
        assert!(queue.pop_frame(2, soon(), &mut counters).is_none());
        assert!(started.elapsed() >= Duration::from_millis(15));
        assert_eq!(counters.stale, 1);
    }

    #[test]
    fn test_held_payload_becomes_stale() {
        let mut queue = ProducerQueue::new("cam");
        queue.callback()(packet(9));

        let mut counters = PopCounters::default();
        assert!(queue.pop_frame(4, soon(), &mut counters).is_none());
        assert_eq!(counters.held_back, 1);

        // Frame 9 is never requested; requesting 10 discards it
        queue.callback()(packet(10));
        let mut counters = PopCounters::default();
        assert!(queue.pop_frame(10, soon(), &mut counters).is_some());
        assert_eq!(counters.stale, 1);
    }
}
