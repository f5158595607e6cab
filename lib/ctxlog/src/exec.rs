/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::any::Any;
use std::fmt;
use std::sync::Arc;

struct Node {
    parent: Option<Arc<Node>>,
    value: Box<dyn Any + Send + Sync>,
}

/// An immutable chain of typed values passed along a call path.
///
/// Deriving a context never changes its parent. A value stored in a child
/// shadows values of the same type for that child and its descendants only.
#[derive(Clone, Default)]
pub struct ExecContext {
    node: Option<Arc<Node>>,
}

impl ExecContext {
    /// The empty root context
    pub fn background() -> Self {
        ExecContext::default()
    }

    pub fn with_value<T>(&self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        ExecContext {
            node: Some(Arc::new(Node {
                parent: self.node.clone(),
                value: Box::new(value),
            })),
        }
    }

    /// The nearest value of type `T`, walking towards the root
    pub fn value<T: Any>(&self) -> Option<&T> {
        let mut node = self.node.as_deref();
        while let Some(n) = node {
            let value: &(dyn Any + Send + Sync) = &*n.value;
            if let Some(v) = value.downcast_ref::<T>() {
                return Some(v);
            }
            node = n.parent.as_deref();
        }
        None
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.node.as_deref();
        while let Some(n) = node {
            depth += 1;
            node = n.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("depth", &self.depth())
            .finish()
    }
}
