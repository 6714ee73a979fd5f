use std::sync::Arc;

use http::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::interceptor::Interceptor;

/// Transport-wide configuration.
#[derive(Clone)]
pub struct TransportOptions {
    /// Base URL all call URLs are derived from; a trailing slash is
    /// tolerated and stripped.
    pub base_url: String,
    /// Interceptors in declaration order. The last one wraps all the
    /// others and sees the call first.
    pub interceptors: Vec<Arc<dyn Interceptor>>,
}

impl TransportOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            interceptors: Vec::new(),
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }
}

/// Per-call options, owned by the caller and immutable once the call
/// starts.
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Extra request headers; identically named defaults are replaced.
    pub headers: Option<HeaderMap>,
    /// Emitted as `grpc-timeout: <n>m`. Enforcement is left to the server
    /// or the HTTP layer.
    pub timeout_ms: Option<u64>,
    /// Cancels the HTTP exchange and the frame loop when triggered.
    pub signal: Option<CancellationToken>,
}

impl CallOptions {
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}
