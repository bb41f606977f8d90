//! L1 Auth Transport.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lattice_config::{AuthMethod, ProviderType};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::http::{HttpTransport, Response};

/// Notified whenever credentials change (e.g. after a refresh), so the
/// caller can persist new tokens.
#[async_trait]
pub trait TokenUpdateListener: Send + Sync {
    /// Called exactly once per successful refresh with the new credentials.
    async fn on_token_update(&self, auth: &AuthMethod);
}

struct NoopListener;

#[async_trait]
impl TokenUpdateListener for NoopListener {
    async fn on_token_update(&self, _auth: &AuthMethod) {}
}

/// A refresher knows how to exchange a refresh token for a new access token.
/// Providers implement this against their specific OAuth endpoint
///.
#[async_trait]
pub trait OAuthRefresher: Send + Sync {
    /// Perform the refresh, returning the new credentials.
    async fn refresh(&self, current: &AuthMethod) -> Result<AuthMethod, TransportError>;
}

/// Wraps [`HttpTransport`]: injects the provider's auth header, and on a
/// 401/403 performs a single-flight OAuth refresh before replaying the
/// request exactly once.
pub struct AuthTransport {
    inner: HttpTransport,
    provider_type: ProviderType,
    auth: Mutex<AuthMethod>,
    refresher: Option<Arc<dyn OAuthRefresher>>,
    listener: Arc<dyn TokenUpdateListener>,
    /// Guards the single in-flight refresh so concurrent 401s share one
    /// refresh operation.
    refresh_lock: Mutex<()>,
}

impl AuthTransport {
    /// Build an auth transport around `inner` with the given provider type
    /// and initial credentials.
    #[must_use]
    pub fn new(inner: HttpTransport, provider_type: ProviderType, auth: AuthMethod) -> Self {
        Self {
            inner,
            provider_type,
            auth: Mutex::new(auth),
            refresher: None,
            listener: Arc::new(NoopListener),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Attach an OAuth refresher (required for [`AuthMethod::OAuth`] credentials).
    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn OAuthRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Attach a listener notified when credentials are refreshed.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TokenUpdateListener>) -> Self {
        self.listener = listener;
        self
    }

    async fn auth_headers(&self) -> HashMap<String, String> {
        let auth = self.auth.lock().await;
        let mut headers = HashMap::new();
        match &*auth {
            AuthMethod::ApiKey { value } => match self.provider_type {
                ProviderType::Anthropic => {
                    headers.insert("x-api-key".to_string(), value.clone());
                },
                ProviderType::OpenaiCompat => {
                    headers.insert("authorization".to_string(), format!("Bearer {value}"));
                },
            },
            AuthMethod::OAuth { access, .. } => {
                headers.insert("authorization".to_string(), format!("Bearer {access}"));
            },
            AuthMethod::None => {},
        }
        headers
    }

    /// POST with auth injection and single-flight refresh-and-replay on 401/403.
    pub async fn post(
        &self,
        url: &str,
        body: &Value,
        extra_headers: &HashMap<String, String>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, TransportError> {
        let mut headers = self.auth_headers().await;
        headers.extend(extra_headers.clone());

        let response = self.inner.post(url, body, &headers, cancel).await?;
        if !matches!(response.status(), 401 | 403) {
            return Ok(response);
        }

        self.refresh_once().await?;

        let mut retried_headers = self.auth_headers().await;
        retried_headers.extend(extra_headers.clone());
        self.inner.post(url, body, &retried_headers, cancel).await
    }

    /// GET with auth injection and single-flight refresh-and-replay on 401/403.
    pub async fn get(
        &self,
        url: &str,
        extra_headers: &HashMap<String, String>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, TransportError> {
        let mut headers = self.auth_headers().await;
        headers.extend(extra_headers.clone());

        let response = self.inner.get(url, &headers, cancel).await?;
        if !matches!(response.status(), 401 | 403) {
            return Ok(response);
        }

        self.refresh_once().await?;

        let mut retried_headers = self.auth_headers().await;
        retried_headers.extend(extra_headers.clone());
        self.inner.get(url, &retried_headers, cancel).await
    }

    /// Refresh credentials, but only once even under concurrent callers.
    ///
    /// The `refresh_lock` mutex is the single-flight gate: the first caller
    /// to acquire it performs the refresh and updates `self.auth`; every
    /// other concurrent caller blocks on the same lock and, once it acquires
    /// the lock, finds `self.auth` already updated and returns immediately
    /// without refreshing again — N concurrent requests hitting 401 invoke
    /// the refresh endpoint exactly once.
    async fn refresh_once(&self) -> Result<(), TransportError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.auth.lock().await.clone_for_refresh();
        let AuthMethod::OAuth { access: old_access, .. } = &current else {
            return Err(TransportError::RefreshFailed(
                "401 received but credentials are not OAuth; cannot refresh".to_string(),
            ));
        };

        {
            let live = self.auth.lock().await;
            if let AuthMethod::OAuth { access, .. } = &*live {
                if access != old_access {
                    // Another caller already refreshed while we waited for the lock.
                    return Ok(());
                }
            }
        }

        let refresher = self.refresher.as_ref().ok_or_else(|| {
            TransportError::RefreshFailed("no OAuth refresher configured".to_string())
        })?;

        match refresher.refresh(&current).await {
            Ok(new_auth) => {
                *self.auth.lock().await = new_auth.clone();
                self.listener.on_token_update(&new_auth).await;
                info!("oauth token refreshed");
                Ok(())
            },
            Err(e) => {
                warn!(error = %e, "oauth token refresh failed");
                Err(TransportError::RefreshFailed(e.to_string()))
            },
        }
    }
}

impl AuthMethod {
    fn clone_for_refresh(&self) -> AuthMethod {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRefresher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl OAuthRefresher for CountingRefresher {
        async fn refresh(&self, _current: &AuthMethod) -> Result<AuthMethod, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(AuthMethod::OAuth {
                access: "new-access".to_string(),
                refresh: "new-refresh".to_string(),
                expires: 9_999_999_999,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_refreshes_single_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = AuthTransport::new(
            HttpTransport::new(reqwest::Client::new()),
            ProviderType::OpenaiCompat,
            AuthMethod::OAuth {
                access: "old-access".to_string(),
                refresh: "old-refresh".to_string(),
                expires: 0,
            },
        )
        .with_refresher(Arc::new(CountingRefresher {
            calls: Arc::clone(&calls),
        }));
        let transport = Arc::new(transport);

        let mut handles = Vec::new();
        for _ in 0..5 {
            let t = Arc::clone(&transport);
            handles.push(tokio::spawn(async move { t.refresh_once().await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let auth = transport.auth.lock().await;
        assert!(matches!(&*auth, AuthMethod::OAuth { access, .. } if access == "new-access"));
    }

    #[tokio::test]
    async fn refresh_without_oauth_credentials_fails() {
        let transport = AuthTransport::new(
            HttpTransport::new(reqwest::Client::new()),
            ProviderType::OpenaiCompat,
            AuthMethod::ApiKey {
                value: "sk-1".to_string(),
            },
        );
        let result = transport.refresh_once().await;
        assert!(matches!(result, Err(TransportError::RefreshFailed(_))));
    }

    #[tokio::test]
    async fn api_key_header_depends_on_provider_type() {
        let anthropic = AuthTransport::new(
            HttpTransport::new(reqwest::Client::new()),
            ProviderType::Anthropic,
            AuthMethod::ApiKey {
                value: "key".to_string(),
            },
        );
        let headers = anthropic.auth_headers().await;
        assert_eq!(headers.get("x-api-key"), Some(&"key".to_string()));

        let openai = AuthTransport::new(
            HttpTransport::new(reqwest::Client::new()),
            ProviderType::OpenaiCompat,
            AuthMethod::ApiKey {
                value: "key".to_string(),
            },
        );
        let headers = openai.auth_headers().await;
        assert_eq!(headers.get("authorization"), Some(&"Bearer key".to_string()));
    }
}
