/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::RefCell;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use slog::{OwnedKVList, Record};

use ctxlog_types::log::{DropReason, LogStats};

#[macro_use]
mod macros;

mod format;
pub use format::StdLogConfig;
use format::StdLogFormatter;

thread_local! {
    static TL_BUF: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(1024));
}

/// The two console streams a line can go to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

struct ConsoleWriter {
    io: Mutex<Box<dyn Write + Send>>,
    styled: bool,
}

impl ConsoleWriter {
    fn new<W: Write + Send + 'static>(io: W, styled: bool) -> Self {
        ConsoleWriter {
            io: Mutex::new(Box::new(io)),
            styled,
        }
    }
}

/// Renders records as single text lines on stdout or stderr.
///
/// The caller picks the stream. Each line is fully formatted before the
/// stream lock is taken, so concurrent writers never interleave partial
/// lines.
pub struct ConsoleSink {
    stdout: ConsoleWriter,
    stderr: ConsoleWriter,
    formatter: StdLogFormatter,
    stats: Arc<LogStats>,
}

impl ConsoleSink {
    /// Sink bound to the process stdout and stderr, styled if they are terminals.
    pub fn new(config: StdLogConfig) -> Self {
        let stdout = io::stdout();
        let stdout_styled = stdout.is_terminal();
        let stderr = io::stderr();
        let stderr_styled = stderr.is_terminal();
        ConsoleSink {
            stdout: ConsoleWriter::new(stdout, stdout_styled),
            stderr: ConsoleWriter::new(stderr, stderr_styled),
            formatter: StdLogFormatter::new(config),
            stats: Arc::new(LogStats::default()),
        }
    }

    /// Sink writing plain text to the given writers.
    pub fn with_writers<O, E>(config: StdLogConfig, stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        ConsoleSink {
            stdout: ConsoleWriter::new(stdout, false),
            stderr: ConsoleWriter::new(stderr, false),
            formatter: StdLogFormatter::new(config),
            stats: Arc::new(LogStats::default()),
        }
    }

    pub fn get_stats(&self) -> Arc<LogStats> {
        Arc::clone(&self.stats)
    }

    pub fn write(
        &self,
        stream: ConsoleStream,
        record: &Record,
        logger_values: &OwnedKVList,
    ) -> Result<(), slog::Error> {
        let writer = match stream {
            ConsoleStream::Stdout => &self.stdout,
            ConsoleStream::Stderr => &self.stderr,
        };
        self.stats.add_submitted();

        TL_BUF.with_borrow_mut(|buf| {
            buf.clear();
            if let Err(e) = self
                .formatter
                .format(buf, writer.styled, record, logger_values)
            {
                self.stats.add_dropped(DropReason::FormatFailed);
                return Err(e);
            }

            let mut io = writer.io.lock().unwrap_or_else(|e| e.into_inner());
            match io.write_all(buf).and_then(|_| io.flush()) {
                Ok(_) => {
                    self.stats.add_written(buf.len());
                    Ok(())
                }
                Err(e) => {
                    self.stats.add_dropped(DropReason::DeliveryFailed);
                    Err(e.into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use slog::{Drain, Logger, Never, o};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct StreamDrain(Arc<ConsoleSink>, ConsoleStream);

    impl Drain for StreamDrain {
        type Ok = ();
        type Err = Never;

        fn log(&self, record: &Record, values: &OwnedKVList) -> Result<(), Never> {
            let _ = self.0.write(self.1, record, values);
            Ok(())
        }
    }

    fn logger(sink: &Arc<ConsoleSink>, stream: ConsoleStream) -> Logger {
        Logger::root(StreamDrain(Arc::clone(sink), stream), o!("scope" => "test"))
    }

    #[test]
    fn select_stream() {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let sink = Arc::new(ConsoleSink::with_writers(
            StdLogConfig::default(),
            out.clone(),
            err.clone(),
        ));

        slog::info!(logger(&sink, ConsoleStream::Stdout), "to stdout"; "num" => 1);
        assert!(err.contents().is_empty());
        let line = out.contents();
        assert!(line.contains(" INFO to stdout"));
        assert!(line.contains(" scope=test,"));
        assert!(line.contains(" num=1,"));
        assert!(line.ends_with('\n'));
        assert_eq!(line.lines().count(), 1);

        slog::error!(logger(&sink, ConsoleStream::Stderr), "to stderr");
        assert!(err.contents().contains(" ERROR to stderr"));
        assert_eq!(out.contents().lines().count(), 1);

        let snap = sink.get_stats().snapshot();
        assert_eq!(snap.io.total, 2);
        assert_eq!(snap.io.passed, 2);
        let written = out.contents().len() + err.contents().len();
        assert_eq!(snap.io.size, written as u64);
    }

    #[test]
    fn code_position() {
        let out = SharedBuffer::default();
        let config = StdLogConfig {
            append_code_position: true,
            backtrace_level: None,
        };
        let sink = Arc::new(ConsoleSink::with_writers(config, out.clone(), io::sink()));

        slog::info!(logger(&sink, ConsoleStream::Stdout), "located");
        let line = out.contents();
        assert!(line.contains(&format!("<{}:", file!())));
    }

    #[test]
    fn backtrace_for_error() {
        let err = SharedBuffer::default();
        let sink = Arc::new(ConsoleSink::with_writers(
            StdLogConfig::verbose(),
            io::sink(),
            err.clone(),
        ));

        slog::error!(logger(&sink, ConsoleStream::Stderr), "failed");
        assert!(err.contents().lines().count() > 1);
    }

    #[test]
    fn write_failure_counted() {
        let sink = Arc::new(ConsoleSink::with_writers(
            StdLogConfig::default(),
            BrokenPipe,
            io::sink(),
        ));

        slog::info!(logger(&sink, ConsoleStream::Stdout), "lost");
        let snap = sink.get_stats().snapshot();
        assert_eq!(snap.io.total, 1);
        assert_eq!(snap.io.passed, 0);
        assert_eq!(snap.drop.delivery_failed, 1);
    }
}
