use std::time::Duration;

/// Per-request options, threaded explicitly through resolve -> dispatch ->
/// extractor -> selector. Never read from process-wide state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Upper bound, in bytes, on the size of a selected rendition.
    pub max_size: f64,
    /// Calling service tag, passed through for logging.
    pub service: Option<String>,
    /// Calling user tag, passed through for logging.
    pub user: Option<String>,
    /// When false, cache reads are skipped for this request; writes still happen.
    pub use_cache: bool,
    /// Bound on the whole resolution; expiry aborts all in-flight extractors.
    pub timeout: Option<Duration>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            max_size: f64::INFINITY,
            service: None,
            user: None,
            use_cache: true,
            timeout: None,
        }
    }
}

impl RequestContext {
    pub fn with_max_size(mut self, max_size: f64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
