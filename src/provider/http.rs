use crate::error::{PaymentError, PaymentResult};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

/// Shared outbound HTTP client for provider API calls: timeout and a
/// bounded retry with exponential backoff on 429 and 5xx. Provider
/// protocols surface their own failures through the response body, which
/// adapters interpret; this layer only distinguishes transport errors.
#[derive(Clone)]
pub struct ProviderHttpClient {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl ProviderHttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> PaymentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Network {
                message: format!("failed to initialize HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            timeout,
            max_retries,
        })
    }

    /// POST a JSON body, parse a JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &JsonValue,
        headers: &[(&str, &str)],
    ) -> PaymentResult<T> {
        self.request_json(reqwest::Method::POST, url, Some(body), headers)
            .await
    }

    /// GET with query parameters already encoded into the URL, parse a
    /// JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> PaymentResult<T> {
        self.request_json(reqwest::Method::GET, url, None, &[]).await
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&JsonValue>,
        headers: &[(&str, &str)],
    ) -> PaymentResult<T> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let mut request = self.client.request(method.clone(), url).timeout(self.timeout);
            for (k, v) in headers {
                request = request.header(*k, *v);
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request.send().await.map_err(|e| PaymentError::Network {
                message: format!("provider request failed: {e}"),
            });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            PaymentError::Protocol {
                                provider: "http".to_string(),
                                message: format!("invalid provider JSON response: {e}"),
                            }
                        });
                    }

                    if status.as_u16() == 429 {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                            continue;
                        }
                        return Err(PaymentError::RateLimit {
                            message: "provider rate limit exceeded".to_string(),
                            retry_after_seconds: None,
                        });
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "provider server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    return Err(PaymentError::Protocol {
                        provider: "http".to_string(),
                        message: format!("HTTP {status}: {text}"),
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(PaymentError::Network {
            message: "provider request failed".to_string(),
        }))
    }
}
