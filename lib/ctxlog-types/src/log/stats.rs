/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// Why a line or report never reached its destination.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DropReason {
    FormatFailed,
    ChannelClosed,
    ChannelOverflow,
    DeliveryFailed,
}

impl DropReason {
    const COUNT: usize = 4;

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Counters shared by a sink and its io side.
///
/// Sinks never surface their own failures to the caller, so these counters
/// are the only place a lost line or report shows up.
#[derive(Default)]
pub struct LogStats {
    submitted: AtomicU64,
    delivered: AtomicU64,
    bytes: AtomicU64,
    dropped: [AtomicU64; DropReason::COUNT],
}

impl LogStats {
    /// An item entered the sink
    pub fn add_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// An item left the sink without a known wire size
    pub fn add_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// A line of `size` bytes was written out
    pub fn add_written(&self, size: usize) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn add_dropped(&self, reason: DropReason) {
        self.dropped[reason.slot()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LogSnapshot {
        let dropped = |reason: DropReason| self.dropped[reason.slot()].load(Ordering::Relaxed);
        LogSnapshot {
            io: LogIoSnapshot {
                total: self.submitted.load(Ordering::Relaxed),
                passed: self.delivered.load(Ordering::Relaxed),
                size: self.bytes.load(Ordering::Relaxed),
            },
            drop: LogDropSnapshot {
                format_failed: dropped(DropReason::FormatFailed),
                channel_closed: dropped(DropReason::ChannelClosed),
                channel_overflow: dropped(DropReason::ChannelOverflow),
                delivery_failed: dropped(DropReason::DeliveryFailed),
            },
        }
    }
}

#[derive(Clone, Copy, Default, Debug, Eq, PartialEq)]
pub struct LogSnapshot {
    pub io: LogIoSnapshot,
    pub drop: LogDropSnapshot,
}

#[derive(Clone, Copy, Default, Debug, Eq, PartialEq)]
pub struct LogIoSnapshot {
    pub total: u64,
    pub passed: u64,
    pub size: u64,
}

#[derive(Clone, Copy, Default, Debug, Eq, PartialEq)]
pub struct LogDropSnapshot {
    pub format_failed: u64,
    pub channel_closed: u64,
    pub channel_overflow: u64,
    pub delivery_failed: u64,
}

impl LogDropSnapshot {
    pub fn get(&self, reason: DropReason) -> u64 {
        match reason {
            DropReason::FormatFailed => self.format_failed,
            DropReason::ChannelClosed => self.channel_closed,
            DropReason::ChannelOverflow => self.channel_overflow,
            DropReason::DeliveryFailed => self.delivery_failed,
        }
    }

    pub fn sum(&self) -> u64 {
        self.format_failed + self.channel_closed + self.channel_overflow + self.delivery_failed
    }
}
