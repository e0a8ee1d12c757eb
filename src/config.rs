//! Configuration types for the lecture2notes client.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. Defaults match the reference backend running
//! locally: `http://127.0.0.1:8000`, a 2-second poll interval and a 5-second
//! error display window.

use crate::error::ClientError;
use crate::lifecycle::Timing;
use crate::observer::SharedObserver;
use std::fmt;
use std::time::Duration;

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Configuration for talking to the summarization backend.
///
/// # Example
/// ```rust
/// use lecture2notes::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://localhost:9000")
///     .poll_interval_ms(1000)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "http://localhost:9000");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend root URL, without trailing slash. Default: `http://127.0.0.1:8000`.
    pub base_url: String,

    /// Delay between a `processing` status and the next poll. Default: 2000.
    ///
    /// There is no retry cap and no backoff: polling continues at this fixed
    /// pace until the job finishes or is superseded.
    pub poll_interval_ms: u64,

    /// How long an auto-clearing error message stays visible. Default: 5000.
    pub error_clear_ms: u64,

    /// Delay between completion and the "results ready" event. Default: 100.
    pub reveal_delay_ms: u64,

    /// Per-request HTTP timeout in seconds. Default: 600.
    ///
    /// Uploads of long recordings are slow; the timeout has to cover the
    /// whole multipart body, not just the first byte.
    pub request_timeout_secs: u64,

    /// Lifecycle observer. If None, events are dropped.
    pub observer: Option<SharedObserver>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 2000,
            error_clear_ms: 5000,
            reveal_delay_ms: 100,
            request_timeout_secs: 600,
            observer: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("error_clear_ms", &self.error_clear_ms)
            .field("reveal_delay_ms", &self.reveal_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn JobObserver>"))
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// The lifecycle delays as [`Duration`]s.
    pub fn timing(&self) -> Timing {
        Timing {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            error_clear_delay: Duration::from_millis(self.error_clear_ms),
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
        }
    }

    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn error_clear_ms(mut self, ms: u64) -> Self {
        self.config.error_clear_ms = ms;
        self
    }

    pub fn reveal_delay_ms(mut self, ms: u64) -> Self {
        self.config.reveal_delay_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.poll_interval_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "Poll interval must be ≥ 1 ms".into(),
            ));
        }
        Ok(self.config)
    }
}
