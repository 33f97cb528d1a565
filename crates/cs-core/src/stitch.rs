//! Follow-up stitching.
//!
//! People often report a check in two bursts: "2k" first, then the line
//! and location a few seconds later. A detail-only follow-up from the
//! same sender inside a short window attaches to that sender's most
//! recent event instead of being discarded.
//!
//! Each sender has at most one open slot. The attach deadline is fixed
//! at the primary message's timestamp plus the window; follow-ups never
//! push it out, so a slow trickle of details cannot keep an event open
//! indefinitely.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::SenderId;

#[derive(Debug)]
struct OpenSlot {
    event_idx: usize,
    deadline: DateTime<Utc>,
}

/// Tracks the open stitch slot per sender.
#[derive(Debug)]
pub struct Stitcher {
    window_seconds: i64,
    slots: HashMap<SenderId, OpenSlot>,
}

impl Stitcher {
    pub fn new(window_seconds: i64) -> Self {
        Self {
            window_seconds,
            slots: HashMap::new(),
        }
    }

    /// Opens (or replaces) the sender's slot for a newly created event.
    ///
    /// Senderless messages never open a slot; there is nothing to key
    /// a follow-up against.
    pub fn open(
        &mut self,
        sender: Option<&SenderId>,
        primary_ts: DateTime<Utc>,
        event_idx: usize,
    ) {
        let Some(sender) = sender else { return };
        self.slots.insert(
            sender.clone(),
            OpenSlot {
                event_idx,
                deadline: primary_ts + chrono::Duration::seconds(self.window_seconds),
            },
        );
    }

    /// Returns the event index a detail-only message at `ts` attaches to,
    /// if the sender has a live slot. Expired slots are dropped here.
    pub fn attach(&mut self, sender: Option<&SenderId>, ts: DateTime<Utc>) -> Option<usize> {
        let sender = sender?;
        let slot = self.slots.get(sender)?;
        if ts <= slot.deadline {
            Some(slot.event_idx)
        } else {
            self.slots.remove(sender);
            None
        }
    }
}
