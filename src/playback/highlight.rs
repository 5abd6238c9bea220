// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Draw-synchronized highlight channel.
//!
//! Ticks post the slot they sounded along with the instant the tick was
//! scheduled for. A renderer drains the channel once per frame and only
//! applies updates that are due, so the highlight changes on frame
//! boundaries in step with the audio.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Instant;

/// One highlight change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightUpdate {
    /// Highlighted slot, or `None` to clear
    pub slot: Option<usize>,
    /// When the change becomes visible
    pub at: Instant,
}

/// Producer end, held by the playback controller
#[derive(Debug, Clone)]
pub struct HighlightSender {
    tx: Option<Sender<HighlightUpdate>>,
}

impl HighlightSender {
    /// A sender with no consumer; updates are dropped
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Publish an update; a missing or departed consumer is ignored
    pub fn publish(&self, slot: Option<usize>, at: Instant) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(HighlightUpdate { slot, at });
        }
    }
}

/// Consumer end, polled by the renderer once per frame
#[derive(Debug)]
pub struct HighlightReceiver {
    rx: Receiver<HighlightUpdate>,
    pending: VecDeque<HighlightUpdate>,
    current: Option<usize>,
}

impl HighlightReceiver {
    /// Apply every update due at `now` and return the slot to draw highlighted
    pub fn poll_frame(&mut self, now: Instant) -> Option<usize> {
        loop {
            match self.rx.try_recv() {
                Ok(update) => self.pending.push_back(update),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        while let Some(update) = self.pending.front() {
            if update.at > now {
                break;
            }
            self.current = update.slot;
            self.pending.pop_front();
        }
        self.current
    }

    /// Slot highlighted as of the last poll
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Updates received but not yet due
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Create a connected sender/receiver pair
pub fn channel() -> (HighlightSender, HighlightReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        HighlightSender { tx: Some(tx) },
        HighlightReceiver {
            rx,
            pending: VecDeque::new(),
            current: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_due_updates_applied_in_order() {
        let (tx, mut rx) = channel();
        let now = Instant::now();
        tx.publish(Some(0), now);
        tx.publish(Some(1), now);

        assert_eq!(rx.poll_frame(now), Some(1));
        assert_eq!(rx.current(), Some(1));
    }

    #[test]
    fn test_future_update_waits_for_its_frame() {
        let (tx, mut rx) = channel();
        let now = Instant::now();
        tx.publish(Some(2), now);
        tx.publish(Some(3), now + Duration::from_millis(500));

        assert_eq!(rx.poll_frame(now), Some(2));
        assert_eq!(rx.pending(), 1);
        assert_eq!(rx.poll_frame(now + Duration::from_millis(499)), Some(2));
        assert_eq!(rx.poll_frame(now + Duration::from_millis(500)), Some(3));
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn test_clear() {
        let (tx, mut rx) = channel();
        let now = Instant::now();
        tx.publish(Some(4), now);
        tx.publish(None, now);
        assert_eq!(rx.poll_frame(now), None);
    }

    #[test]
    fn test_disconnected_sender_is_silent() {
        let tx = HighlightSender::disconnected();
        tx.publish(Some(1), Instant::now());

        let (tx, rx) = channel();
        drop(rx);
        tx.publish(Some(1), Instant::now());
    }
}
