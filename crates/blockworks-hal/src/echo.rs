//! Text sink a program uses to report problems to the operator.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

/// Operator-facing text output of a program.
pub trait Echo: Send + Sync {
    fn echo(&self, message: &str);
}

/// Forwards every line to the `tracing` log under the `echo` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEcho;

impl Echo for TracingEcho {
    fn echo(&self, message: &str) {
        info!(target: "echo", "{message}");
    }
}

/// Keeps every echoed line in memory.  Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferEcho {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferEcho {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line echoed so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return the buffered lines.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Echo for BufferEcho {
    fn echo(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
