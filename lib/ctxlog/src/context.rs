/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, LazyLock};

use slog::{BorrowedKV, Discard, Logger, OwnedKV, Record, RecordLocation, RecordStatic, o};

use ctxlog_report::{ConfigError, Dsn, ErrorTracker, NopTracker, ReportClient, ReportEncoder};
use ctxlog_stdlog::ConsoleSink;
use ctxlog_types::Level;
use ctxlog_types::log::{LogSnapshot, LogStats};

use super::field::{self, Field, FieldList, FieldSlice};
use super::{ExecContext, LogConfig, OperatingMode, RouterDrain, SeverityRouter};

static NOP_LOGGER: LazyLock<LoggerContext> = LazyLock::new(LoggerContext::new_nop);

/// State shared by every handle derived from one root.
struct Engine {
    root: Logger,
    router: Arc<SeverityRouter>,
    console_stats: Option<Arc<LogStats>>,
}

/// A cheap to clone logger handle carrying its own fields.
///
/// Handles derived from the same root share the console sink, the severity
/// router with its runtime level, and the error tracker with its persistent
/// tags and release. Each handle owns its field list, which is attached to
/// every event it emits.
#[derive(Clone)]
pub struct LoggerContext {
    engine: Arc<Engine>,
    tracker: Arc<dyn ErrorTracker>,
    fields: Arc<Vec<Field>>,
    logger: Logger,
    nop: bool,
}

impl LoggerContext {
    /// Root handle with default settings.
    ///
    /// An empty `dsn` disables error reporting, a malformed one is an error.
    pub fn new(dsn: &str, verbose: bool) -> Result<Self, ConfigError> {
        LoggerContext::build(LogConfig::new(dsn, OperatingMode::from(verbose)))
    }

    pub fn build(config: LogConfig) -> Result<Self, ConfigError> {
        let client = if config.dsn.is_empty() {
            ReportClient::new(None)
        } else {
            let dsn = Dsn::parse(&config.dsn)?;
            match &config.report_backend {
                Some(backend) => {
                    ReportClient::with_backend(dsn, &config.report_async, Arc::clone(backend))
                }
                None => ReportClient::new(Some(dsn)),
            }
        };
        Ok(LoggerContext::build_with_tracker(config, Arc::new(client)))
    }

    /// Root handle reporting to the given tracker, the DSN settings are ignored
    pub fn build_with_tracker(config: LogConfig, tracker: Arc<dyn ErrorTracker>) -> Self {
        let router = Arc::new(SeverityRouter::new(
            config.mode,
            config.static_level,
            config.initial_level,
        ));

        let console_config = config.mode.console_config();
        let console = match config.console {
            Some((stdout, stderr)) => ConsoleSink::with_writers(console_config, stdout, stderr),
            None => ConsoleSink::new(console_config),
        };
        let console_stats = console.get_stats();

        let drain = RouterDrain::new(
            Arc::clone(&router),
            console,
            ReportEncoder::new(Arc::clone(&tracker)),
        );
        let engine = Engine {
            root: Logger::root(drain, o!()),
            router,
            console_stats: Some(console_stats),
        };
        LoggerContext::with_engine(Arc::new(engine), tracker, false)
    }

    /// The shared handle that drops everything
    pub fn nop() -> Self {
        NOP_LOGGER.clone()
    }

    fn new_nop() -> Self {
        let engine = Engine {
            root: Logger::root(Discard, o!()),
            router: Arc::new(SeverityRouter::default()),
            console_stats: None,
        };
        LoggerContext::with_engine(Arc::new(engine), Arc::new(NopTracker), true)
    }

    fn with_engine(engine: Arc<Engine>, tracker: Arc<dyn ErrorTracker>, nop: bool) -> Self {
        let fields = Arc::new(Vec::new());
        let logger = engine.root.new(OwnedKV(FieldList(Arc::clone(&fields))));
        LoggerContext {
            engine,
            tracker,
            fields,
            logger,
            nop,
        }
    }

    #[inline]
    pub fn is_nop(&self) -> bool {
        self.nop
    }

    /// The underlying logger, with this handle's fields attached
    #[inline]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    #[inline]
    pub fn tracker(&self) -> &Arc<dyn ErrorTracker> {
        &self.tracker
    }

    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn console_stats(&self) -> Option<LogSnapshot> {
        self.engine.console_stats.as_ref().map(|s| s.snapshot())
    }

    /// Child handle with `fields` appended to the current ones
    pub fn with_fields<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        let added: Vec<Field> = fields.into_iter().collect();
        let mut all = Vec::with_capacity(self.fields.len() + added.len());
        all.extend_from_slice(&self.fields);
        all.extend_from_slice(&added);
        self.derive(all, &added)
    }

    /// Child handle where `fields` replace current fields with the same key
    pub fn with_fields_overwrite<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        let added: Vec<Field> = fields.into_iter().collect();
        let all = field::merge_overwrite(&self.fields, &added);
        self.derive(all, &added)
    }

    fn derive(&self, fields: Vec<Field>, added: &[Field]) -> Self {
        if !self.nop {
            self.tracker.set_tags(field::tags_of(added));
        }

        let fields = Arc::new(fields);
        // always rebuilt from the root so that replaced values are gone
        let logger = self
            .engine
            .root
            .new(OwnedKV(FieldList(Arc::clone(&fields))));
        LoggerContext {
            engine: Arc::clone(&self.engine),
            tracker: Arc::clone(&self.tracker),
            fields,
            logger,
            nop: self.nop,
        }
    }

    /// Attach this handle to a child of `ctx`
    pub fn attach(&self, ctx: &ExecContext) -> ExecContext {
        ctx.with_value(AttachedLogger(self.clone()))
    }

    pub fn set_release(&self, release: &str) {
        if !self.nop {
            self.tracker.set_release(release);
        }
    }

    pub fn with_release(self, release: &str) -> Self {
        self.set_release(release);
        self
    }

    pub fn release(&self) -> Option<String> {
        self.tracker.release()
    }

    /// Change the console level of every handle sharing this root
    pub fn set_level(&self, level: Level) {
        if !self.nop {
            self.engine.router.set_level(level);
        }
    }

    pub fn level(&self) -> Level {
        self.engine.router.level()
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, fields: &[Field]) {
        self.emit(slog::Level::Debug, Location::caller(), msg, fields);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, fields: &[Field]) {
        self.emit(slog::Level::Info, Location::caller(), msg, fields);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, fields: &[Field]) {
        self.emit(slog::Level::Error, Location::caller(), msg, fields);
    }

    #[track_caller]
    pub fn log(&self, level: Level, msg: &str, fields: &[Field]) {
        self.emit(level.as_slog(), Location::caller(), msg, fields);
    }

    fn emit(
        &self,
        level: slog::Level,
        location: &'static Location<'static>,
        msg: &str,
        fields: &[Field],
    ) {
        if self.nop {
            return;
        }

        let record_location = RecordLocation {
            file: location.file(),
            line: location.line(),
            column: location.column(),
            function: "",
            module: "",
        };
        let record_static = RecordStatic {
            location: &record_location,
            tag: "",
            level,
        };
        self.logger.log(&Record::new(
            &record_static,
            &format_args!("{msg}"),
            BorrowedKV(&FieldSlice(fields)),
        ));
    }
}

impl fmt::Debug for LoggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerContext")
            .field("fields", &self.fields)
            .field("level", &self.level())
            .field("nop", &self.nop)
            .finish()
    }
}

struct AttachedLogger(LoggerContext);

/// Attach `logger` to a child of `ctx`
pub fn with_logger(ctx: &ExecContext, logger: &LoggerContext) -> ExecContext {
    logger.attach(ctx)
}

/// The nearest attached handle, or the shared nop handle if there is none
pub fn from_context(ctx: &ExecContext) -> LoggerContext {
    match ctx.value::<AttachedLogger>() {
        Some(attached) => attached.0.clone(),
        None => LoggerContext::nop(),
    }
}

/// Attach a child of the current handle with `fields` appended
pub fn with_fields<I>(ctx: &ExecContext, fields: I) -> ExecContext
where
    I: IntoIterator<Item = Field>,
{
    from_context(ctx).with_fields(fields).attach(ctx)
}

/// Attach a child of the current handle with `fields` overwriting
pub fn with_fields_overwrite<I>(ctx: &ExecContext, fields: I) -> ExecContext
where
    I: IntoIterator<Item = Field>,
{
    from_context(ctx).with_fields_overwrite(fields).attach(ctx)
}

pub fn set_level(ctx: &ExecContext, level: Level) {
    from_context(ctx).set_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{self, Write};
    use std::sync::Mutex;

    use ctxlog_report::{CapturedError, TagMap};

    use crate::SharedWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Tags(Mutex<TagMap>);

    impl ErrorTracker for Tags {
        fn capture_message(&self, _message: &str, _tags: TagMap) {}

        fn capture_error(&self, _error: CapturedError, _tags: TagMap) {}

        fn set_tags(&self, tags: TagMap) {
            self.0.lock().unwrap().extend(tags);
        }

        fn set_release(&self, _release: &str) {}

        fn release(&self) -> Option<String> {
            None
        }

        fn is_nop(&self) -> bool {
            false
        }
    }

    fn handle(mode: OperatingMode) -> (LoggerContext, Buffer, Buffer) {
        let out = Buffer::default();
        let err = Buffer::default();
        let mut config = LogConfig::new("", mode);
        config.set_console_writers(SharedWriter::new(out.clone()), SharedWriter::new(err.clone()));
        let logger = LoggerContext::build(config).unwrap();
        (logger, out, err)
    }

    fn keys(logger: &LoggerContext) -> Vec<&str> {
        logger.fields().iter().map(|f| f.key()).collect()
    }

    #[test]
    fn empty_dsn() {
        let logger = LoggerContext::new("", false).unwrap();
        assert!(!logger.is_nop());
        assert!(logger.tracker().is_nop());
        assert!(logger.console_stats().is_some());
    }

    #[test]
    fn malformed_dsn() {
        assert!(matches!(
            LoggerContext::new("^", true),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn nop_handle() {
        let logger = LoggerContext::nop();
        assert!(logger.is_nop());
        assert!(logger.tracker().is_nop());
        assert!(logger.console_stats().is_none());

        logger.set_release("v1");
        assert!(logger.release().is_none());
        logger.set_level(Level::Error);
        assert_eq!(LoggerContext::nop().level(), Level::Info);

        let child = logger.with_fields([Field::string("a", "b")]);
        assert!(child.is_nop());
        child.error("dropped", &[]);
    }

    #[test]
    fn append_fields() {
        let (root, out, _) = handle(OperatingMode::Default);
        let a = root.with_fields([Field::string("k1", "v1")]);
        let b = a.with_fields([Field::int("k2", 2), Field::string("k1", "again")]);
        assert!(root.fields().is_empty());
        assert_eq!(keys(&a), ["k1"]);
        assert_eq!(keys(&b), ["k1", "k2", "k1"]);

        b.info("hello", &[Field::string("extra", "x")]);
        let line = out.contents();
        assert!(line.contains(" INFO hello"));
        assert!(line.contains(" k1=v1,"));
        assert!(line.contains(" k2=2,"));
        assert!(line.contains(" extra=x,"));
    }

    #[test]
    fn overwrite_fields() {
        let (root, out, _) = handle(OperatingMode::Default);
        let a = root.with_fields([Field::string("user", "alice"), Field::int("try", 1)]);
        let b = a.with_fields_overwrite([Field::string("user", "bob")]);
        assert_eq!(keys(&b), ["user", "try"]);
        assert_eq!(keys(&a), ["user", "try"]);

        b.info("who", &[]);
        let line = out.contents();
        assert!(line.contains(" user=bob,"));
        assert!(!line.contains("alice"));
    }

    #[test]
    fn derive_sets_tags() {
        let tags = Arc::new(Tags::default());
        let root = LoggerContext::build_with_tracker(LogConfig::default(), tags.clone());
        let _child = root
            .with_fields([
                Field::string("request", "r1"),
                Field::error(io::Error::other("not a tag")),
            ])
            .with_fields_overwrite([Field::int("request", 2)]);

        let tags = tags.0.lock().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["request"], "2");
    }

    #[test]
    fn level_shared_by_derived() {
        let (root, out, _) = handle(OperatingMode::Verbose);
        let child = root.with_fields([Field::string("c", "1")]);

        child.debug("hidden", &[]);
        assert!(out.contents().is_empty());

        root.set_level(Level::Debug);
        assert_eq!(child.level(), Level::Debug);
        child.debug("shown", &[]);
        assert!(out.contents().contains(" DEBUG shown"));
    }

    #[test]
    fn caller_position() {
        let (root, _, err) = handle(OperatingMode::Verbose);
        let line = line!() + 1;
        root.error("failed", &[]);
        let text = err.contents();
        assert!(text.contains(" ERROR failed"));
        assert!(text.contains(&format!("context.rs:{line}>")));
    }

    #[test]
    fn attach_and_retrieve() {
        let (root, _, _) = handle(OperatingMode::Default);
        let background = ExecContext::background();
        assert!(from_context(&background).is_nop());

        let ctx = with_logger(&background, &root);
        assert!(!from_context(&ctx).is_nop());

        let ctx2 = with_fields(&ctx, [Field::string("step", "1")]);
        assert_eq!(keys(&from_context(&ctx2)), ["step"]);
        assert!(from_context(&ctx).fields().is_empty());

        let ctx3 = with_fields_overwrite(&ctx2, [Field::string("step", "2")]);
        let step = from_context(&ctx3).fields()[0].tag_value();
        assert_eq!(step.as_deref(), Some("2"));

        set_level(&ctx3, Level::Error);
        assert_eq!(root.level(), Level::Error);
    }

    #[test]
    fn fields_on_empty_context() {
        let ctx = with_fields(&ExecContext::background(), [Field::string("a", "b")]);
        assert!(from_context(&ctx).is_nop());
    }
}
