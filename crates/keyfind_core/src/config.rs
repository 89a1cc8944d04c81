//! Template configuration.

/// Configuration for a [`Template`](crate::Template).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Namespace every key is built in.
    pub namespace: String,

    /// Keys per batch read.
    pub batch_size: usize,

    /// Store calls (batch reads, touches) in flight per stream.
    pub max_concurrency: usize,

    /// Whether a filtered query falling back to a full scan logs a warning.
    pub scan_warnings: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            namespace: "test".to_string(),
            batch_size: 100,
            max_concurrency: 8,
            scan_warnings: true,
        }
    }
}

impl TemplateConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the batch size. Zero is treated as one.
    #[must_use]
    pub const fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets the per-stream concurrency. Zero is treated as one.
    #[must_use]
    pub const fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = if limit == 0 { 1 } else { limit };
        self
    }

    /// Sets whether full-scan fallbacks are logged.
    #[must_use]
    pub const fn scan_warnings(mut self, enabled: bool) -> Self {
        self.scan_warnings = enabled;
        self
    }

    /// Batch size, never zero.
    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Concurrency, never zero.
    pub(crate) fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
