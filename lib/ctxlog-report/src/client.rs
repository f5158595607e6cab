/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;

use ctxlog_types::log::{AsyncLogConfig, DropReason, LogStats};

use super::{
    AsyncReportTransport, CapturedError, Dsn, ErrorTracker, Report, ReportBackend, ReportKind,
    TagMap,
};

/// Error tracking client bound to at most one destination.
///
/// Persistent tags and the release are shared by every handle holding the
/// client. Without a destination all captures are skipped, while tags and
/// release are still kept.
pub struct ReportClient {
    dsn: Option<Dsn>,
    transport: Option<AsyncReportTransport>,
    tags: Mutex<TagMap>,
    release: ArcSwapOption<String>,
    stats: Arc<LogStats>,
}

impl ReportClient {
    /// Client without a delivery backend.
    ///
    /// With `Some(dsn)` reports are still accounted for, and dropped as
    /// `channel_closed`.
    pub fn new(dsn: Option<Dsn>) -> Self {
        ReportClient {
            dsn,
            transport: None,
            tags: Mutex::new(TagMap::new()),
            release: ArcSwapOption::empty(),
            stats: Arc::new(LogStats::default()),
        }
    }

    /// Parse `dsn` and build a client, an empty string means no destination
    pub fn from_dsn(dsn: &str) -> Result<Self, super::ConfigError> {
        if dsn.is_empty() {
            Ok(ReportClient::new(None))
        } else {
            Ok(ReportClient::new(Some(Dsn::parse(dsn)?)))
        }
    }

    pub fn with_backend(
        dsn: Dsn,
        async_conf: &AsyncLogConfig,
        backend: Arc<dyn ReportBackend>,
    ) -> Self {
        let stats = Arc::new(LogStats::default());
        let transport =
            AsyncReportTransport::spawn(async_conf, dsn.clone(), backend, Arc::clone(&stats));
        ReportClient {
            dsn: Some(dsn),
            transport: Some(transport),
            tags: Mutex::new(TagMap::new()),
            release: ArcSwapOption::empty(),
            stats,
        }
    }

    #[inline]
    pub fn dsn(&self) -> Option<&Dsn> {
        self.dsn.as_ref()
    }

    /// Copy of the persistent tags
    pub fn tags(&self) -> TagMap {
        self.tags.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn get_stats(&self) -> Arc<LogStats> {
        Arc::clone(&self.stats)
    }

    fn submit(&self, kind: ReportKind, event_tags: TagMap) {
        if self.dsn.is_none() {
            return;
        }
        self.stats.add_submitted();

        let Some(transport) = &self.transport else {
            self.stats.add_dropped(DropReason::ChannelClosed);
            return;
        };

        // event tags win over persistent ones
        let mut tags = self.tags();
        tags.extend(event_tags);
        transport.send(Report::new(kind, tags, self.release()));
    }
}

impl ErrorTracker for ReportClient {
    fn capture_message(&self, message: &str, tags: TagMap) {
        self.submit(ReportKind::Message(message.to_string()), tags);
    }

    fn capture_error(&self, error: CapturedError, tags: TagMap) {
        self.submit(ReportKind::Error(error), tags);
    }

    fn set_tags(&self, tags: TagMap) {
        if tags.is_empty() {
            return;
        }
        let mut current = self.tags.lock().unwrap_or_else(|e| e.into_inner());
        current.extend(tags);
    }

    fn set_release(&self, release: &str) {
        self.release.store(Some(Arc::new(release.to_string())));
    }

    fn release(&self) -> Option<String> {
        self.release.load_full().map(|r| (*r).clone())
    }

    fn is_nop(&self) -> bool {
        self.dsn.is_none()
    }
}
