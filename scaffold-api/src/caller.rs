//! Outbound HTTP client for calling sibling microservices.
//!
//! Every failure carries the name of the microservice the call targeted.
//! Remote errors (the service answered with a failure status) are kept apart
//! from transport errors (the request never completed), and a structured
//! error body from the remote side is surfaced with its code and message.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum ServiceCallError {
    #[error("request to microservice '{microservice}' failed: {cause}")]
    Transport {
        microservice: String,
        #[source]
        cause: reqwest::Error,
    },
    #[error("microservice '{microservice}' responded {status}: {message}")]
    Remote {
        microservice: String,
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
}

impl ServiceCallError {
    /// Name of the microservice the failed call targeted.
    pub fn microservice(&self) -> &str {
        match self {
            Self::Transport { microservice, .. } | Self::Remote { microservice, .. } => {
                microservice
            }
        }
    }

    /// True when the remote service answered with a structured error of its
    /// own, rather than the call failing in transit or with a bare status.
    pub fn originated_remotely(&self) -> bool {
        matches!(self, Self::Remote { code: Some(_), .. })
    }
}

#[derive(Default, Deserialize)]
struct RemoteErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// JSON client bound to one named microservice. Paths start with `/` and are
/// appended to the configured base URL.
#[derive(Clone)]
pub struct ServiceCaller {
    microservice: String,
    base_url: String,
    client: Client,
}

impl ServiceCaller {
    pub fn new(microservice: &str, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            microservice: microservice.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceCallError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ServiceCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ServiceCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(microservice = %self.microservice, %method, %url, "calling microservice");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|cause| {
            ServiceCallError::Transport {
                microservice: self.microservice.clone(),
                cause,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(microservice = %self.microservice, %url, %status, "microservice responded");
            return response
                .json()
                .await
                .map_err(|cause| ServiceCallError::Transport {
                    microservice: self.microservice.clone(),
                    cause,
                });
        }

        if status.is_client_error() {
            warn!(microservice = %self.microservice, %url, %status, "microservice rejected the call");
        } else {
            error!(microservice = %self.microservice, %url, %status, "microservice call failed");
        }

        let body = response
            .json::<RemoteErrorBody>()
            .await
            .unwrap_or_default();
        Err(ServiceCallError::Remote {
            microservice: self.microservice.clone(),
            status,
            code: body.code,
            message: body
                .message
                .unwrap_or_else(|| "microservice call failed".to_string()),
        })
    }
}

/// Typed wrapper over the example microservice.
#[derive(Clone)]
pub struct ExampleService {
    caller: ServiceCaller,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleDetail {
    pub custom_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExampleService {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            caller: ServiceCaller::new("example", base_url, timeout)?,
        })
    }

    pub async fn detail(&self, custom_id: &str) -> Result<ExampleDetail, ServiceCallError> {
        self.caller.get(&format!("/detail/{custom_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base_url: &str) -> ExampleService {
        ExampleService::new(base_url, Duration::from_secs(1)).expect("client should build")
    }

    #[tokio::test]
    async fn remote_detail_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/detail/42")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"custom_id":"42","description":"sample"}"#)
            .create_async()
            .await;

        let detail = service(&server.url()).detail("42").await.expect("call should succeed");
        assert_eq!(detail.custom_id, "42");
        assert_eq!(detail.description.as_deref(), Some("sample"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remote_errors_carry_the_microservice_name() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/detail/7")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":"VALIDATION","message":"bad id"}"#)
            .create_async()
            .await;

        let err = service(&server.url()).detail("7").await.unwrap_err();
        assert_eq!(err.microservice(), "example");
        assert!(err.originated_remotely());
        match err {
            ServiceCallError::Remote {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(code.as_deref(), Some("VALIDATION"));
                assert_eq!(message, "bad id");
            }
            other => panic!("expected a remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unstructured_failures_get_the_generic_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/detail/9")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let err = service(&server.url()).detail("9").await.unwrap_err();
        assert!(!err.originated_remotely());
        match err {
            ServiceCallError::Remote { code, message, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "microservice call failed");
            }
            other => panic!("expected a remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failures_are_tagged_too() {
        // nothing listens on port 1
        let err = service("http://127.0.0.1:1").detail("42").await.unwrap_err();
        assert_eq!(err.microservice(), "example");
        assert!(!err.originated_remotely());
        assert!(matches!(err, ServiceCallError::Transport { .. }));
    }
}
