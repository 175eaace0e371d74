//! Local callback server for the authorization-code redirect.
//!
//! The browser lands on `http://localhost:<port>/callback?code=...&state=...`
//! after the user approves the app; this server parses that request, hands
//! the code to the waiting login task, and answers the browser with a small
//! HTML page.

use crate::error::{AuthError, AuthResult};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Path the redirect URI must point at.
pub const CALLBACK_PATH: &str = "/callback";

const HTML_SUCCESS: &str = r#"<!DOCTYPE html>
<html>
<head><title>larkdown - Login Successful</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; padding-top: 4rem;">
  <h1>Login successful</h1>
  <p>You can close this window and return to your terminal.</p>
  <script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#;

fn html_error(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>larkdown - Login Failed</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; padding-top: 4rem;">
  <h1>Login failed</h1>
  <p><code>{}</code></p>
</body>
</html>"#,
        html_escape(error)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Callbacks waiting for their authorization code, keyed by `state`.
type PendingMap = Arc<RwLock<HashMap<String, oneshot::Sender<Result<String, String>>>>>;

/// Local HTTP listener for OAuth redirects.
pub struct CallbackServer {
    pending: PendingMap,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    port: u16,
}

impl CallbackServer {
    /// Bind the listener on `127.0.0.1:<port>` and start accepting.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is already taken, e.g. by another login
    /// in progress.
    pub async fn bind(port: u16) -> AuthResult<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::callback(format!("Failed to bind 127.0.0.1:{port}: {e}")))?;

        info!(port, "Callback server listening");

        let pending: PendingMap = Arc::new(RwLock::new(HashMap::new()));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let accept_pending = pending.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let pending = accept_pending.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, pending).await {
                                        warn!(error = %e, "Error handling callback request");
                                    }
                                });
                            }
                            Err(e) => warn!(error = %e, "Error accepting connection"),
                        }
                    }
                    _ = &mut shutdown_rx => {
                        debug!("Callback server shutting down");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            pending,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            port,
        })
    }

    /// The port the server is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the redirect carrying the given `state` parameter.
    ///
    /// Returns the authorization code, or an error when the provider
    /// reported one, the wait timed out, or the server was stopped.
    pub async fn wait_for_code(&self, state: &str, timeout: Duration) -> AuthResult<String> {
        let (tx, rx) = oneshot::channel();
        self.pending.write().await.insert(state.to_string(), tx);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(code))) => Ok(code),
            Ok(Ok(Err(error))) => Err(AuthError::callback(error)),
            Ok(Err(_)) => {
                self.pending.write().await.remove(state);
                Err(AuthError::callback("Login cancelled"))
            }
            Err(_) => {
                self.pending.write().await.remove(state);
                Err(AuthError::Timeout)
            }
        }
    }

    /// Stop the server and fail all pending waits.
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }

        let mut pending = self.pending.write().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err("Callback server stopped".to_string()));
        }
    }
}

async fn handle_connection(mut stream: TcpStream, pending: PendingMap) -> AuthResult<()> {
    use tokio::io::AsyncReadExt;

    let mut buffer = [0u8; 4096];
    let n = stream
        .read(&mut buffer)
        .await
        .map_err(|e| AuthError::callback(format!("Failed to read request: {e}")))?;

    let request = String::from_utf8_lossy(&buffer[..n]);
    let first_line = request.lines().next().unwrap_or("");
    let mut parts = first_line.split_whitespace();
    let (_method, target) = (parts.next(), parts.next());

    let Some(target) = target else {
        respond(&mut stream, 400, "text/plain", "Bad Request").await;
        return Ok(());
    };

    let parsed = match url::Url::parse(&format!("http://127.0.0.1{target}")) {
        Ok(u) => u,
        Err(_) => {
            respond(&mut stream, 400, "text/plain", "Bad Request").await;
            return Ok(());
        }
    };

    if parsed.path() != CALLBACK_PATH {
        respond(&mut stream, 404, "text/plain", "Not Found").await;
        return Ok(());
    }

    let params: HashMap<String, String> = parsed
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    debug!(
        has_code = params.contains_key("code"),
        has_error = params.contains_key("error"),
        "Received authorization callback"
    );

    // The state parameter ties the redirect to the login that initiated it.
    let Some(state) = params.get("state") else {
        respond(
            &mut stream,
            400,
            "text/html",
            &html_error("Missing state parameter"),
        )
        .await;
        return Ok(());
    };

    let Some(waiter) = pending.write().await.remove(state) else {
        warn!(state = %state, "Callback with unknown state parameter");
        respond(
            &mut stream,
            400,
            "text/html",
            &html_error("Unknown or expired state parameter"),
        )
        .await;
        return Ok(());
    };

    if let Some(error) = params.get("error") {
        let message = params
            .get("error_description")
            .cloned()
            .unwrap_or_else(|| error.clone());
        let _ = waiter.send(Err(message.clone()));
        respond(&mut stream, 200, "text/html", &html_error(&message)).await;
        return Ok(());
    }

    match params.get("code") {
        Some(code) => {
            let _ = waiter.send(Ok(code.clone()));
            respond(&mut stream, 200, "text/html", HTML_SUCCESS).await;
        }
        None => {
            let _ = waiter.send(Err("No authorization code in callback".to_string()));
            respond(
                &mut stream,
                400,
                "text/html",
                &html_error("No authorization code in callback"),
            )
            .await;
        }
    }

    Ok(())
}

async fn respond(stream: &mut TcpStream, status: u16, content_type: &str, body: &str) {
    use tokio::io::AsyncWriteExt;

    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Unknown",
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    );

    let _ = stream.write_all(response.as_bytes()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn bind_any() -> (CallbackServer, u16) {
        // Port 0 lets the OS pick a free port; re-read it from the bound
        // listener via a plain bind first.
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        (CallbackServer::bind(port).await.unwrap(), port)
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("it's \"ok\""), "it&#39;s &quot;ok&quot;");
    }

    #[test]
    fn test_html_error_escapes() {
        let html = html_error("<img src=x>");
        assert!(html.contains("&lt;img src=x&gt;"));
        assert!(!html.contains("<img"));
    }

    #[tokio::test]
    async fn test_code_delivered_to_matching_state() {
        let (server, port) = bind_any().await;

        let waiter = tokio::spawn({
            let url = format!("http://127.0.0.1:{port}{CALLBACK_PATH}?code=abc123&state=s1");
            async move {
                // Give wait_for_code a moment to register
                tokio::time::sleep(Duration::from_millis(50)).await;
                reqwest::get(&url).await.unwrap()
            }
        });

        let code = server
            .wait_for_code("s1", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(code, "abc123");

        let response = waiter.await.unwrap();
        assert!(response.text().await.unwrap().contains("Login successful"));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_provider_error_propagated() {
        let (server, port) = bind_any().await;

        tokio::spawn({
            let url = format!(
                "http://127.0.0.1:{port}{CALLBACK_PATH}?error=access_denied&error_description=denied%20by%20user&state=s2"
            );
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = reqwest::get(&url).await;
            }
        });

        let err = server
            .wait_for_code("s2", Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            AuthError::CallbackFailed(message) => assert_eq!(message, "denied by user"),
            other => panic!("unexpected error: {other:?}"),
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_state_rejected() {
        let (server, port) = bind_any().await;

        let url = format!("http://127.0.0.1:{port}{CALLBACK_PATH}?code=abc&state=other");
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 400);
        assert!(response.text().await.unwrap().contains("Unknown or expired"));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_wrong_path_404() {
        let (server, port) = bind_any().await;

        let response = reqwest::get(&format!("http://127.0.0.1:{port}/other"))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_fails_pending_waits() {
        let (server, _port) = bind_any().await;
        let server = Arc::new(server);

        let wait = tokio::spawn({
            let server = server.clone();
            async move { server.wait_for_code("s3", Duration::from_secs(30)).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        server.stop().await;

        let result = wait.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let (server, _port) = bind_any().await;

        let err = server
            .wait_for_code("never", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Timeout));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_port_conflict() {
        let (server, port) = bind_any().await;
        assert!(CallbackServer::bind(port).await.is_err());
        server.stop().await;
    }
}
