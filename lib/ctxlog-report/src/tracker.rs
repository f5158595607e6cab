/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{CapturedError, TagMap};

/// The error tracking client seen by the log pipeline.
///
/// Implementations must be safe to share between threads without outer
/// locking, and must never fail towards the caller: delivery problems are
/// accounted for internally and otherwise dropped.
pub trait ErrorTracker: Send + Sync {
    /// Report a plain message with per event tags
    fn capture_message(&self, message: &str, tags: TagMap);

    /// Report an error with per event tags
    fn capture_error(&self, error: CapturedError, tags: TagMap);

    /// Merge `tags` into the tags attached to every later report
    fn set_tags(&self, tags: TagMap);

    fn set_release(&self, release: &str);

    fn release(&self) -> Option<String>;

    /// Whether reports go nowhere
    fn is_nop(&self) -> bool;
}

/// Tracker that drops everything and keeps no state.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopTracker;

impl ErrorTracker for NopTracker {
    fn capture_message(&self, _message: &str, _tags: TagMap) {}

    fn capture_error(&self, _error: CapturedError, _tags: TagMap) {}

    fn set_tags(&self, _tags: TagMap) {}

    fn set_release(&self, _release: &str) {}

    fn release(&self) -> Option<String> {
        None
    }

    fn is_nop(&self) -> bool {
        true
    }
}
