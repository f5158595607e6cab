/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use ctxlog_report::ReportBackend;
use ctxlog_types::Level;
use ctxlog_types::log::AsyncLogConfig;

use super::OperatingMode;

/// A writer that can be handed to more than one logger.
#[derive(Clone)]
pub struct SharedWriter(Arc<Mutex<dyn Write + Send>>);

impl SharedWriter {
    pub fn new<W: Write + Send + 'static>(io: W) -> Self {
        SharedWriter(Arc::new(Mutex::new(io)))
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).flush()
    }
}

#[derive(Clone)]
pub struct LogConfig {
    pub(crate) dsn: String,
    pub(crate) mode: OperatingMode,
    pub(crate) static_level: Level,
    pub(crate) initial_level: Level,
    pub(crate) report_async: AsyncLogConfig,
    pub(crate) report_backend: Option<Arc<dyn ReportBackend>>,
    pub(crate) console: Option<(SharedWriter, SharedWriter)>,
}

impl LogConfig {
    pub fn new(dsn: &str, mode: OperatingMode) -> Self {
        LogConfig {
            dsn: dsn.to_string(),
            mode,
            static_level: Level::Debug,
            initial_level: Level::Info,
            report_async: AsyncLogConfig::default(),
            report_backend: None,
            console: None,
        }
    }

    #[inline]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    #[inline]
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn set_dsn(&mut self, dsn: &str) {
        self.dsn = dsn.to_string();
    }

    pub fn set_mode(&mut self, mode: OperatingMode) {
        self.mode = mode;
    }

    /// Console records below this tier are never written
    pub fn set_static_level(&mut self, level: Level) {
        self.static_level = level;
    }

    /// Starting value of the runtime adjustable console level
    pub fn set_initial_level(&mut self, level: Level) {
        self.initial_level = level;
    }

    pub fn set_report_async(&mut self, config: AsyncLogConfig) {
        self.report_async = config;
    }

    /// Deliver reports through `backend`.
    ///
    /// Without a backend reports for a configured destination are dropped.
    pub fn set_report_backend(&mut self, backend: Arc<dyn ReportBackend>) {
        self.report_backend = Some(backend);
    }

    /// Write console lines to these writers instead of stdout and stderr
    pub fn set_console_writers(&mut self, stdout: SharedWriter, stderr: SharedWriter) {
        self.console = Some((stdout, stderr));
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::new("", OperatingMode::Default)
    }
}
