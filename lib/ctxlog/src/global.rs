/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Process wide logger for code using the `log` or `slog-scope` macros.

use slog::Logger;
use slog_scope::GlobalLoggerGuard;

use super::LoggerContext;

/// Route `log` records and the `slog-scope` logger through `logger`.
///
/// Dropping the returned guard restores the discarding global logger.
pub fn install(
    logger: &LoggerContext,
    level: log::Level,
) -> Result<GlobalLoggerGuard, log::SetLoggerError> {
    let scope_guard = slog_scope::set_global_logger(logger.logger().clone());
    slog_stdlog::init_with_level(level)?;
    Ok(scope_guard)
}

/// The logger currently installed in the global scope
pub fn current() -> Logger {
    slog_scope::logger()
}
