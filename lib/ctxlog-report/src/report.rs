/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};

pub type TagMap = BTreeMap<String, String>;

/// Owned copy of an error taken out of a log record.
///
/// The log message of the record is kept as context, so the rendered form
/// reads `<message>: <error>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedError {
    context: String,
    description: String,
    sources: Vec<String>,
}

impl CapturedError {
    pub fn new(context: impl Into<String>, error: &(dyn Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut source = error.source();
        while let Some(e) = source {
            sources.push(e.to_string());
            source = e.source();
        }
        CapturedError {
            context: context.into(),
            description: error.to_string(),
            sources,
        }
    }

    #[inline]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Display text of the captured error itself
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Display text of each error in the `source()` chain, outermost first
    #[inline]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            f.write_str(&self.description)
        } else {
            write!(f, "{}: {}", self.context, self.description)
        }
    }
}

impl Error for CapturedError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportKind {
    Message(String),
    Error(CapturedError),
}

/// A single event as handed to a report backend.
#[derive(Clone, Debug)]
pub struct Report {
    pub kind: ReportKind,
    pub tags: TagMap,
    pub release: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    pub fn new(kind: ReportKind, tags: TagMap, release: Option<String>) -> Self {
        Report {
            kind,
            tags,
            release,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection reset")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("query failed")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn capture_chain() {
        let e = CapturedError::new("load user", &Outer(Inner));
        assert_eq!(e.description(), "query failed");
        assert_eq!(e.sources(), ["connection reset".to_string()]);
        assert_eq!(e.to_string(), "load user: query failed");
    }

    #[test]
    fn capture_no_context() {
        let e = CapturedError::new("", &Inner);
        assert_eq!(e.to_string(), "connection reset");
        assert!(e.sources().is_empty());
    }
}
