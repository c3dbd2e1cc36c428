//! Template expansion engine for plexconnect
//!
//! Device templates are XML documents with embedded `{{NAME(argument)}}`
//! commands. A conversion fetches the media-server document for a request,
//! then runs two passes over the template:
//!
//! - the tree pass executes structural commands (`COPY`, `CUT`, `ADDXML`,
//!   ...) that duplicate, remove or attach content
//! - the value pass replaces value commands (`VAL`, `URL`, `VIDEOURL`, ...)
//!   in text and attributes with their results
//!
//! Media URLs choose between direct play and server-side transcoding from the
//! media descriptors and the device's settings.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use atv_settings::AtvSettings;
//! use pms_client::{PmsClient, ServerDirectory};
//! use xml_converter::{ConvertRequest, Converter, ConverterConfig, PmsGateway};
//!
//! let gateway = PmsGateway::new(Arc::new(ServerDirectory::new()), PmsClient::new());
//! let converter = Converter::new(
//!     Arc::new(gateway),
//!     Arc::new(AtvSettings::new()),
//!     ConverterConfig::from_env()?,
//! );
//!
//! let request = ConvertRequest::new("192.168.1.10", "/library/sections", "Sections.xml")
//!     .with_option("PlexConnectUDID", "atv-udid")
//!     .with_option("aTVAddress", "192.168.1.30");
//! println!("{}", converter.convert(&request));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod commands;
pub mod config;
pub mod context;
mod converter;
pub mod error;
pub mod expand;
pub mod expr;
pub mod federation;
pub mod gateway;
pub mod logging;
pub mod macros;
pub mod media;
pub mod registry;
pub mod resolve;
pub mod template;
pub mod translate;

pub use commands::{select_playlist, PlayMode};
pub use config::{ConfigError, ConverterConfig};
pub use context::{Expansion, Key, Services, Source, MAIN_SOURCE};
pub use converter::{error_document, ConvertRequest, Converter};
pub use error::{ConvertError, Result};
pub use gateway::{MemoryGateway, PmsGateway, ServerGateway};
pub use logging::{init_logging, init_logging_from_env, LoggingMode};
pub use registry::{CommandRegistry, Handler, StructuralFn, ValueFn};
pub use template::{Node, TemplateStore};
pub use translate::{Passthrough, Translator};
