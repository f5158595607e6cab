/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod async_log;
pub use async_log::AsyncLogConfig;

mod stats;
pub use stats::{DropReason, LogDropSnapshot, LogIoSnapshot, LogSnapshot, LogStats};
