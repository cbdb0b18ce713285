//! Deferred statement log.

/// Ordered statements the schema editor runs at the end of a migration,
/// such as constraints added after the tables they reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredLog {
    statements: Vec<String>,
}

/// Position in a [`DeferredLog`] where a tenant step started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a frame must be closed to bracket the statements deferred inside it"]
pub struct DeferredFrame {
    start: usize,
}

impl DeferredFrame {
    /// Log length when the frame was opened.
    pub fn start(&self) -> usize {
        self.start
    }
}

impl DeferredLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer a statement.
    pub fn push(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }

    /// Number of deferred statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Deferred statements in execution order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Take every deferred statement, leaving the log empty.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.statements)
    }

    /// Mark the current end of the log.
    pub fn open_frame(&self) -> DeferredFrame {
        DeferredFrame {
            start: self.statements.len(),
        }
    }

    /// Close `frame`.
    ///
    /// If statements were deferred since the frame was opened, `pre` is
    /// inserted right before them and `post` appended after them. Returns the
    /// number of statements deferred inside the frame.
    pub fn close_frame(&mut self, frame: DeferredFrame, pre: &[String], post: &[String]) -> usize {
        if self.statements.len() <= frame.start {
            return 0;
        }
        let added = self.statements.len() - frame.start;
        self.statements
            .splice(frame.start..frame.start, pre.iter().cloned());
        self.statements.extend(post.iter().cloned());
        added
    }
}
