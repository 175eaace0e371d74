//! OAuth login flow and token persistence for larkdown.
//!
//! This crate implements the authorization-code dance against the platform's
//! accounts endpoints:
//!
//! 1. A stored token is reused while it is still valid.
//! 2. An expired token with a refresh token is refreshed in place.
//! 3. Otherwise a local callback server is started, the browser is pointed
//!    at the authorization URL, and the returned code is exchanged for a
//!    user access token.
//!
//! Tokens are persisted as JSON under the larkdown config directory
//! (`~/.config/larkdown/auth.json` on Linux) with restrictive permissions
//! (0600 on Unix).
//!
//! # Example
//!
//! ```no_run
//! use larkdown_auth::{AppCredentials, LoginFlow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = AppCredentials::new(
//!         "cli_a1b2c3",
//!         "secret",
//!         "http://localhost:3000/callback",
//!     );
//!
//!     let flow = LoginFlow::new(credentials)?;
//!     let token = flow.login().await?;
//!     println!("logged in, token expires at {:?}", token.expires_at);
//!     Ok(())
//! }
//! ```

mod callback;
mod error;
mod login;
mod oauth;
mod store;

pub use callback::{CallbackServer, CALLBACK_PATH};
pub use error::{AuthError, AuthResult};
pub use login::LoginFlow;
pub use oauth::{generate_state, AppCredentials, OAuthClient, TokenResponse, UserInfo};
pub use store::{TokenStore, UserToken};
