//! # openrobot-api - A client for the OpenRobot API
//!
//! Typed access to the OpenRobot endpoints (image recognition, OCR, NSFW
//! checks, translation, speech, lyrics and the queued text tasks) through
//! either an async [`Client`] or a [`BlockingClient`]. Both share one request
//! pipeline, so they authenticate, validate URLs, decode bodies and map
//! errors identically.
//!
//! ## Quick Start
//!
//! ```no_run
//! use openrobot_api::{Client, MediaInput};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), openrobot_api::Error> {
//!     let client = Client::builder().token("my-token").build()?;
//!
//!     let celebrities = client
//!         .celebrity(MediaInput::url("https://example.com/photo.jpg"))
//!         .await?;
//!     for celebrity in celebrities.iter() {
//!         println!("{} ({:.2})", celebrity.name, celebrity.confidence);
//!     }
//!
//!     let lyrics = client.lyrics("Never Gonna Give You Up").await?;
//!     println!("{:?}", lyrics.lyrics);
//!     Ok(())
//! }
//! ```
//!
//! ## Tokens
//!
//! Without an explicit [`ClientBuilder::token`], the token is read from
//! `~/.openrobot/api/cridentials.json` and then from the
//! `OPENROBOT_API_TOKEN` environment variable. The shared [`TEST_TOKEN`]
//! works for a handful of calls per day.
//!
//! ## Error Handling
//!
//! Status codes map to [`Error`] variants that keep the decoded error body:
//!
//! ```no_run
//! use openrobot_api::{Client, Error, MediaInput};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().token("my-token").build()?;
//! match client.ocr(MediaInput::url("https://example.com/a.png")).await {
//!     Ok(response) => println!("{}", response.text),
//!     Err(Error::Forbidden { message, error_code, .. }) => {
//!         eprintln!("Forbidden ({:?}): {}", error_code, message);
//!     }
//!     Err(Error::TooManyRequests { retry_after, .. }) => {
//!         eprintln!("Still rate limited, retry after {:?}", retry_after);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Rate Limits
//!
//! A `429` is retried after the `Retry-After` delay, up to five attempts by
//! default:
//!
//! ```no_run
//! use openrobot_api::{BlockingClient, Tries};
//! use openrobot_api::rate_limit::RateLimitConfig;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), openrobot_api::Error> {
//! let client = BlockingClient::builder()
//!     .token("my-token")
//!     .rate_limit_config(
//!         RateLimitConfig::builder()
//!             .tries(Tries::Unbounded)
//!             .max_wait(Duration::from_secs(60))
//!             .build(),
//!     )
//!     .build_blocking()?;
//! # Ok(())
//! # }
//! ```

mod blocking;
mod client;
pub mod credentials;
mod endpoints;
mod error;
mod pipeline;
pub mod rate_limit;
mod request;
mod response;
pub mod results;
mod retry;

pub use blocking::BlockingClient;
pub use client::{Client, ClientBuilder};
pub use endpoints::{MediaInput, TtsEngine};
pub use error::{Error, ErrorResponse, Result};
pub use request::{Request, RequestBody};
pub use response::{decode_body, Body, Response};
pub use retry::Tries;

/// Base URL that relative request paths resolve against.
pub const DEFAULT_BASE_URL: &str = "https://api.openrobot.xyz/api/";

/// Hosts requests may target unless overridden with
/// [`ClientBuilder::allowed_hosts`].
pub const DEFAULT_ALLOWED_HOSTS: &str = r"^https?://(api\.openrobot\.xyz|lyrics\.ayomerdeka\.com)/";

/// Shared token with a small daily quota.
pub const TEST_TOKEN: &str = "I-Am-Testing";
