//! Elasticsearch API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - Client selection from provider configuration
//! - [`transport`] - One request dispatcher per server generation
//! - [`http`] - HTTP utilities for REST API calls
//! - [`error`] - Error kinds shared by all of the above
//!
//! # Example
//!
//! ```ignore
//! use esdetector::config::Config;
//! use esdetector::es::client::ProviderContext;
//!
//! async fn example() -> esdetector::es::Result<()> {
//!     let ctx = ProviderContext::connect(&Config::default()).await?;
//!     println!("talking to a {} cluster", ctx.generation());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{ProviderContext, ServerVersion};
pub use error::{Error, Result};
pub use transport::{Generation, Transport};
