/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;

use flume::{Receiver, Sender, TrySendError};

use ctxlog_types::log::{AsyncLogConfig, DropReason, LogStats};

use super::{Dsn, Report};

/// Delivers one report to the remote service.
///
/// Called from the transport io threads only, never from a logging call.
pub trait ReportBackend: Send + Sync {
    fn deliver(&self, dsn: &Dsn, report: &Report) -> io::Result<()>;
}

/// Hands reports to detached io threads through a bounded channel.
///
/// `send` never blocks: a full or closed channel drops the report and
/// bumps the matching drop counter.
pub struct AsyncReportTransport {
    sender: Sender<Report>,
    stats: Arc<LogStats>,
}

impl AsyncReportTransport {
    pub fn spawn(
        config: &AsyncLogConfig,
        dsn: Dsn,
        backend: Arc<dyn ReportBackend>,
        stats: Arc<LogStats>,
    ) -> Self {
        let (sender, receiver) = flume::bounded::<Report>(config.channel_capacity);

        for i in 0..config.thread_number {
            let io_thread = AsyncIoThread {
                receiver: receiver.clone(),
                dsn: dsn.clone(),
                backend: Arc::clone(&backend),
                stats: Arc::clone(&stats),
            };

            let _detached_thread = std::thread::Builder::new()
                .name(format!("{}#{i}", config.thread_name))
                .spawn(move || {
                    io_thread.run_to_end();
                });
        }

        AsyncReportTransport { sender, stats }
    }

    pub fn send(&self, report: Report) {
        match self.sender.try_send(report) {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => self.stats.add_dropped(DropReason::ChannelOverflow),
            Err(TrySendError::Disconnected(_)) => self.stats.add_dropped(DropReason::ChannelClosed),
        }
    }
}

struct AsyncIoThread {
    receiver: Receiver<Report>,
    dsn: Dsn,
    backend: Arc<dyn ReportBackend>,
    stats: Arc<LogStats>,
}

impl AsyncIoThread {
    fn run_to_end(self) {
        while let Ok(report) = self.receiver.recv() {
            match self.backend.deliver(&self.dsn, &report) {
                Ok(_) => self.stats.add_delivered(),
                Err(_) => self.stats.add_dropped(DropReason::DeliveryFailed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crate::{ReportKind, TagMap};

    #[derive(Default)]
    struct Collect(Mutex<Vec<ReportKind>>);

    impl ReportBackend for Collect {
        fn deliver(&self, _dsn: &Dsn, report: &Report) -> io::Result<()> {
            self.0.lock().unwrap().push(report.kind.clone());
            Ok(())
        }
    }

    struct Refuse;

    impl ReportBackend for Refuse {
        fn deliver(&self, _dsn: &Dsn, _report: &Report) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::ConnectionRefused))
        }
    }

    fn message(s: &str) -> Report {
        Report::new(ReportKind::Message(s.to_string()), TagMap::new(), None)
    }

    fn wait_until<F: Fn() -> bool>(f: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn deliver_in_background() {
        let dsn = Dsn::parse("http://key@localhost/1").unwrap();
        let backend = Arc::new(Collect::default());
        let stats = Arc::new(LogStats::default());
        let transport = AsyncReportTransport::spawn(
            &AsyncLogConfig::with_name("t-report"),
            dsn,
            backend.clone(),
            stats.clone(),
        );

        transport.send(message("first"));
        transport.send(message("second"));
        assert!(wait_until(|| stats.snapshot().io.passed == 2));
        assert_eq!(
            *backend.0.lock().unwrap(),
            [
                ReportKind::Message("first".to_string()),
                ReportKind::Message("second".to_string())
            ]
        );
    }

    #[test]
    fn delivery_failure_counted() {
        let dsn = Dsn::parse("http://key@localhost/1").unwrap();
        let stats = Arc::new(LogStats::default());
        let transport = AsyncReportTransport::spawn(
            &AsyncLogConfig::with_name("t-refuse"),
            dsn,
            Arc::new(Refuse),
            stats.clone(),
        );

        transport.send(message("lost"));
        assert!(wait_until(|| stats.snapshot().drop.delivery_failed == 1));
        assert_eq!(stats.snapshot().io.passed, 0);
    }
}
