//! Request-level conversion: identify the device, fetch the primary
//! document, expand the template and serialize the result

use std::collections::HashMap;
use std::sync::Arc;

use atv_settings::{DeviceRegistry, SettingsStore};
use pms_client::{PmsError, ServerClass};
use tracing::{debug, info, warn};
use xmltree::Element;

use crate::config::ConverterConfig;
use crate::context::{Expansion, Services, DEFAULT_LANGUAGE};
use crate::error::{ConvertError, Result};
use crate::expand::expand;
use crate::federation;
use crate::gateway::ServerGateway;
use crate::registry::CommandRegistry;
use crate::template::{Node, TemplateStore};
use crate::translate::{Passthrough, Translator};

const ERROR_TITLE: &str = "PlexConnect";
const NO_RESPONSE: &str = "No Response from Plex Media Server";
const UNIDENTIFIED_DEVICE: &str = "Unexpected error - unidentified ATV";

/// One client request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertRequest {
    /// Server address or class name (`owned`, `shared`, ...)
    pub server_address: String,
    /// Path of the primary document; empty for none
    pub path: String,
    /// Template name relative to the template directory
    pub template: String,
    /// Request options (`PlexConnectUDID`, `aTVAddress`, `aTVLanguage`, ...)
    pub options: HashMap<String, String>,
}

impl ConvertRequest {
    pub fn new(server_address: impl Into<String>, path: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            path: path.into(),
            template: template.into(),
            options: HashMap::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// Fixed error document shown on the device instead of partial output
pub fn error_document(description: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><atv><body>\
         <dialog id=\"com.sample.error-dialog\"><title>{}</title><description>{}</description></dialog>\
         </body></atv>",
        quick_xml::escape::escape(ERROR_TITLE),
        quick_xml::escape::escape(description)
    )
}

fn error_message(err: &ConvertError) -> String {
    match err {
        ConvertError::Fetch(_) => NO_RESPONSE.to_string(),
        ConvertError::UnidentifiedDevice => UNIDENTIFIED_DEVICE.to_string(),
        other => other.to_string(),
    }
}

/// Shared collaborators for every conversion
///
/// A `Converter` is `Send + Sync`; each call to [`Converter::convert`] runs
/// its own single-threaded expansion pass.
pub struct Converter {
    gateway: Arc<dyn ServerGateway>,
    settings: Arc<dyn SettingsStore>,
    devices: Arc<DeviceRegistry>,
    translator: Arc<dyn Translator>,
    templates: TemplateStore,
    registry: CommandRegistry,
    config: ConverterConfig,
}

impl Converter {
    /// Converter with the built-in commands and untranslated messages
    pub fn new(gateway: Arc<dyn ServerGateway>, settings: Arc<dyn SettingsStore>, config: ConverterConfig) -> Self {
        Self {
            gateway,
            settings,
            devices: Arc::new(DeviceRegistry::new()),
            translator: Arc::new(Passthrough),
            templates: TemplateStore::new(config.template_dir.clone()),
            registry: CommandRegistry::builtin(),
            config,
        }
    }

    pub fn with_devices(mut self, devices: Arc<DeviceRegistry>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Command table, for registering additional handlers
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    fn services(&self) -> Services<'_> {
        Services {
            gateway: &*self.gateway,
            settings: &*self.settings,
            translator: &*self.translator,
            config: &self.config,
            registry: &self.registry,
        }
    }

    /// Convert a request to device XML
    ///
    /// Never fails: any error becomes the error document.
    pub fn convert(&self, request: &ConvertRequest) -> String {
        let result = self
            .templates
            .load(&request.template)
            .and_then(|template| self.convert_tree(request, template));
        match result {
            Ok(xml) => xml,
            Err(err) => {
                warn!("Conversion of {} failed: {}", request.template, err);
                error_document(&error_message(&err))
            }
        }
    }

    /// Expand an already loaded template for `request`
    pub fn convert_tree(&self, request: &ConvertRequest, mut template: Node) -> Result<String> {
        let device_id = self.device_id(&request.options).ok_or(ConvertError::UnidentifiedDevice)?;

        let mut options = request.options.clone();
        options
            .entry("aTVLanguage".to_string())
            .or_insert_with(|| DEFAULT_LANGUAGE.to_string());

        let main = self.primary_document(&device_id, &request.server_address, &request.path)?;
        info!(
            "Converting {} with {} for {}",
            request.path, request.template, device_id
        );

        let mut cx = Expansion::new(
            self.services(),
            device_id,
            request.server_address.clone(),
            options,
            main,
            request.path.clone(),
        );
        expand(&mut cx, &mut template)?;
        template.to_xml()
    }

    /// UDID from the request, else from the device's address
    fn device_id(&self, options: &HashMap<String, String>) -> Option<String> {
        let address = options.get("aTVAddress");
        if let Some(udid) = options.get("PlexConnectUDID").filter(|udid| !udid.is_empty()) {
            if let Some(address) = address {
                self.devices.declare(udid, address);
            }
            return Some(udid.clone());
        }
        address.and_then(|address| self.devices.udid_for_ip(address))
    }

    fn primary_document(&self, device_id: &str, address: &str, path: &str) -> Result<Element> {
        if path.is_empty() {
            debug!("No primary document requested");
            return Ok(Element::new("MediaContainer"));
        }
        if let Ok(class) = address.parse::<ServerClass>() {
            return Ok(federation::aggregate(&*self.gateway, device_id, class, path));
        }
        let server = self
            .gateway
            .resolve_server(device_id, address)
            .ok_or_else(|| PmsError::UnknownServer(address.to_string()))?;
        Ok(self.gateway.fetch_document(device_id, &server, path)?)
    }
}
