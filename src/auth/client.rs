//! HTTP client for the controller's login endpoint.

use krushinova_shared::{LoginRequest, LoginResponse};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use super::error::LoginError;
use super::AuthToken;

/// Client for `POST {base_url}/api/login`.
#[derive(Debug, Clone)]
pub struct LoginClient {
    client: Client,
    /// Base URL of the controller (e.g., "http://localhost:5000").
    base_url: String,
}

impl LoginClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoginError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoginError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken, LoginError> {
        let url = format!("{}/api/login", self.base_url);
        debug!("POST {} as {}", url, username);

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LoginError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        let body: LoginResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if status == StatusCode::UNAUTHORIZED => return Err(LoginError::InvalidCredentials),
            Err(e) => return Err(LoginError::BadResponse(format!("{}: {}", status, e))),
        };

        match body {
            LoginResponse {
                success: true,
                token: Some(token),
            } if !token.is_empty() => {
                info!("Login accepted for {}", username);
                Ok(AuthToken::new(token))
            }
            LoginResponse { success: true, .. } => {
                Err(LoginError::BadResponse("success without a token".into()))
            }
            LoginResponse { success: false, .. } => Err(LoginError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer exactly one HTTP request with a canned JSON response and
    /// return the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if n == 0 || (text.contains("\r\n\r\n") && text.ends_with('}')) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base_url, handle)
    }

    #[tokio::test]
    async fn test_login_success() {
        let (url, server) = serve_once("200 OK", r#"{"success":true,"token":"demo-token"}"#).await;
        let client = LoginClient::new(url, Duration::from_secs(5)).unwrap();

        let token = client.login("admin", "krushinova").await.unwrap();
        assert_eq!(token.as_str(), "demo-token");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/login"));
        assert!(request.contains(r#""username":"admin""#));
        assert!(request.contains(r#""password":"krushinova""#));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let (url, _server) = serve_once("401 Unauthorized", r#"{"success":false}"#).await;
        let client = LoginClient::new(url, Duration::from_secs(5)).unwrap();

        let err = client.login("admin", "wrong").await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_success_without_token() {
        let (url, _server) = serve_once("200 OK", r#"{"success":true}"#).await;
        let client = LoginClient::new(url, Duration::from_secs(5)).unwrap();

        let err = client.login("admin", "krushinova").await.unwrap_err();
        assert!(matches!(err, LoginError::BadResponse(_)));
    }

    #[tokio::test]
    async fn test_login_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = LoginClient::new(url, Duration::from_secs(2)).unwrap();
        let err = client.login("admin", "krushinova").await.unwrap_err();
        assert!(matches!(err, LoginError::ConnectionFailed(_)));
    }
}
