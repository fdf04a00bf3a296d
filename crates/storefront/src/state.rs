//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::broadcast::error::RecvError;
use velora_api::{ApiClient, CartEvents};

use crate::config::StorefrontConfig;

/// How long a cached cart badge count stays valid without an invalidation.
const BADGE_TTL: Duration = Duration::from_secs(60);

/// Upper bound on cached badge counts (one entry per signed-in session).
const BADGE_CAPACITY: u64 = 10_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    cart_events: CartEvents,
    badge_counts: Cache<String, u32>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let api = ApiClient::new(&config.api_base_url);
        let badge_counts = Cache::builder()
            .max_capacity(BADGE_CAPACITY)
            .time_to_live(BADGE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                cart_events: CartEvents::new(),
                badge_counts,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Velora API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// The process-wide cart change broadcast.
    #[must_use]
    pub fn cart_events(&self) -> &CartEvents {
        &self.inner.cart_events
    }

    /// Cached cart badge counts, keyed by bearer token.
    #[must_use]
    pub fn badge_counts(&self) -> &Cache<String, u32> {
        &self.inner.badge_counts
    }

    /// Subscribe to cart change events and drop cached badge counts whenever
    /// one fires, so every view's next badge fetch is authoritative.
    ///
    /// Runs until the process shuts down.
    pub fn start_cart_listener(&self) {
        let mut receiver = self.inner.cart_events.subscribe();
        let state = self.clone();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    // A lagged receiver missed events; the response is the
                    // same either way.
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        state.inner.badge_counts.invalidate_all();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}
