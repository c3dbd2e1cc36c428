//! Private media-server client for plexconnect
//!
//! This crate provides the pieces the XML converter needs to talk to media
//! servers without knowing anything about templates:
//!
//! - [`PmsClient`]: a blocking client that fetches and parses XML documents
//! - [`ServerDirectory`]: per-device bookkeeping of known servers
//! - [`paths`]: direct-play and transcoding path builders
//!
//! ```rust,no_run
//! use pms_client::{ClientIdentity, PmsClient};
//!
//! let client = PmsClient::new();
//! let sections = client.fetch(
//!     "http://192.168.1.10:32400",
//!     "/library/sections",
//!     &ClientIdentity::new("atv-udid"),
//!     "access-token",
//! )?;
//! println!("{} sections", sections.children.len());
//! # Ok::<(), pms_client::PmsError>(())
//! ```

mod client;
mod directory;
mod error;
pub mod paths;

pub use client::{ClientConfig, PmsClient};
pub use directory::{is_class_name, ServerClass, ServerDirectory, ServerRecord};
pub use error::{PmsError, Result};
pub use paths::{get_url, ClientIdentity, VideoTranscode};
