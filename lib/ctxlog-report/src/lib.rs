/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#[macro_use]
mod macros;

mod dsn;
pub use dsn::{ConfigError, Dsn};

mod report;
pub use report::{CapturedError, Report, ReportKind, TagMap};

mod tracker;
pub use tracker::{ErrorTracker, NopTracker};

mod transport;
pub use transport::{AsyncReportTransport, ReportBackend};

mod client;
pub use client::ReportClient;

mod encoder;
pub use encoder::ReportEncoder;
