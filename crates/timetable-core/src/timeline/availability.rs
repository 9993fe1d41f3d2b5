//! Availability index over the time grid.
//!
//! Tracks per-slot occupancy in two bitmaps: one for fixed events and one for
//! committed sessions, so a released session never frees an event slot.
//! Overlap tests use half-open `[start, end)` intervals; back-to-back blocks
//! do not conflict.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::ops::Range;

use super::grid::{DayType, Slot};
use crate::schedule::{Event, Session};

/// Fixed-size bitmap, one bit per slot.
#[derive(Debug, Clone, Default)]
struct OccupancyBits {
    words: Vec<u64>,
}

impl OccupancyBits {
    fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    fn get(&self, i: usize) -> bool {
        self.words[i / 64] & (1 << (i % 64)) != 0
    }

    fn set(&mut self, i: usize) {
        self.words[i / 64] |= 1 << (i % 64);
    }

    fn clear(&mut self, i: usize) {
        self.words[i / 64] &= !(1 << (i % 64));
    }
}

/// A maximal run of consecutive free slots on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRun {
    /// Index of the first slot of the run
    pub first: usize,
    /// Number of slots in the run
    pub len: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SlotRun {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn slot_indices(&self) -> Range<usize> {
        self.first..self.first + self.len
    }
}

/// Free/occupied bookkeeping for one scheduling request.
#[derive(Debug, Clone)]
pub struct AvailabilityIndex {
    slots: Vec<Slot>,
    events: OccupancyBits,
    sessions: OccupancyBits,
    days: BTreeMap<NaiveDate, Range<usize>>,
}

impl AvailabilityIndex {
    /// Index the given slots. Slots are ordered by start time.
    pub fn new(mut slots: Vec<Slot>) -> Self {
        slots.sort_by_key(|s| s.start());

        let mut days: BTreeMap<NaiveDate, Range<usize>> = BTreeMap::new();
        for (i, slot) in slots.iter().enumerate() {
            days.entry(slot.date)
                .and_modify(|r| r.end = i + 1)
                .or_insert(i..i + 1);
        }

        Self {
            events: OccupancyBits::with_len(slots.len()),
            sessions: OccupancyBits::with_len(slots.len()),
            slots,
            days,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Dates covered by the grid, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn day_type(&self, day: NaiveDate) -> DayType {
        DayType::of(day)
    }

    pub fn is_free(&self, index: usize) -> bool {
        !self.events.get(index) && !self.sessions.get(index)
    }

    /// Indices of the slots intersecting `[start, end)`.
    pub fn intersecting(&self, start: NaiveDateTime, end: NaiveDateTime) -> Range<usize> {
        if start >= end {
            return 0..0;
        }
        let first = self.slots.partition_point(|s| s.end() <= start);
        let last = self.slots.partition_point(|s| s.start() < end);
        first..last.max(first)
    }

    /// Mark every slot intersecting an event as occupied.
    pub fn mark_unavailable(&mut self, events: &[Event]) {
        for event in events {
            for i in self.intersecting(event.start, event.end) {
                self.events.set(i);
            }
        }
    }

    /// Commit a placed session.
    pub fn occupy(&mut self, session: &Session) {
        for i in self.intersecting(session.start, session.stop) {
            self.sessions.set(i);
        }
    }

    /// Return the slots of a previously committed session.
    pub fn release(&mut self, session: &Session) {
        for i in self.intersecting(session.start, session.stop) {
            self.sessions.clear(i);
        }
    }

    /// Whether `[start, end)` is covered by grid slots that are all free and
    /// time-contiguous.
    pub fn is_range_free(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        let range = self.intersecting(start, end);
        if range.is_empty() {
            return false;
        }
        let first = &self.slots[range.start];
        let last = &self.slots[range.end - 1];
        if first.start() > start || last.end() < end {
            return false;
        }
        range.clone().all(|i| self.is_free(i))
            && range
                .clone()
                .skip(1)
                .all(|i| self.slots[i - 1].end() == self.slots[i].start())
    }

    /// Contiguous runs of free slots on `day`, in time order.
    pub fn free_ranges(&self, day: NaiveDate) -> Vec<SlotRun> {
        let Some(range) = self.days.get(&day) else {
            return Vec::new();
        };

        let mut runs = Vec::new();
        let mut current: Option<SlotRun> = None;

        for i in range.clone() {
            let slot = &self.slots[i];
            if !self.is_free(i) {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
                continue;
            }

            match current.as_mut() {
                Some(run) if run.end == slot.start() => {
                    run.len += 1;
                    run.end = slot.end();
                }
                _ => {
                    if let Some(run) = current.take() {
                        runs.push(run);
                    }
                    current = Some(SlotRun {
                        first: i,
                        len: 1,
                        start: slot.start(),
                        end: slot.end(),
                    });
                }
            }
        }

        if let Some(run) = current {
            runs.push(run);
        }
        runs
    }
}
