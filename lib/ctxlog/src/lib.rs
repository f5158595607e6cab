/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod field;
pub use field::{ErrorValue, Field, FieldValue};

mod router;
pub use router::{LevelSwitch, OperatingMode, Route, RouterDrain, SeverityRouter};

mod config;
pub use config::{LogConfig, SharedWriter};

mod exec;
pub use exec::ExecContext;

mod context;
pub use context::{
    LoggerContext, from_context, set_level, with_fields, with_fields_overwrite, with_logger,
};

pub mod global;

pub use ctxlog_report::{
    CapturedError, ConfigError, Dsn, ErrorTracker, NopTracker, Report, ReportBackend,
    ReportClient, ReportKind, TagMap,
};
pub use ctxlog_stdlog::ConsoleStream;
pub use ctxlog_types::Level;
pub use ctxlog_types::log::{AsyncLogConfig, LogSnapshot};
