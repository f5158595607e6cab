/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_THREAD_NAME: &str = "ctxlog-report";

/// Settings for a sink that hands work off to detached io threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsyncLogConfig {
    pub channel_capacity: usize,
    pub thread_number: usize,
    pub thread_name: String,
}

impl AsyncLogConfig {
    pub fn with_name(thread_name: &str) -> Self {
        AsyncLogConfig {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            thread_number: 1,
            thread_name: thread_name.to_string(),
        }
    }

    pub fn set_channel_capacity(&mut self, capacity: usize) {
        // a zero sized flume channel would make every try_send a rendezvous
        self.channel_capacity = capacity.max(1);
    }

    pub fn set_thread_number(&mut self, number: usize) {
        self.thread_number = number.max(1);
    }
}

impl Default for AsyncLogConfig {
    fn default() -> Self {
        AsyncLogConfig::with_name(DEFAULT_THREAD_NAME)
    }
}
