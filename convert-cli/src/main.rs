use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use atv_settings::{AtvSettings, Snapshot};
use clap::Parser;
use pms_client::{PmsClient, ServerDirectory, ServerRecord};
use tracing::{debug, info};
use xml_converter::{
    init_logging, ConvertRequest, Converter, ConverterConfig, LoggingMode, MemoryGateway, PmsGateway, ServerGateway,
};
use xmltree::Element;

/// Convert a media-server document with a plexconnect template
///
/// Offline mode (`--source`) reads the document from a file; otherwise it is
/// fetched from `--server`.
#[derive(Parser, Debug)]
#[command(name = "plexconnect-convert")]
#[command(about = "Expand a plexconnect template against a media-server document")]
#[command(version)]
pub struct Args {
    /// Template name, relative to the template directory
    #[arg(short, long)]
    pub template: String,

    /// Directory holding the templates (default: PLEXCONNECT_TEMPLATE_DIR or assets/templates)
    #[arg(long)]
    pub template_dir: Option<PathBuf>,

    /// Media-server address (`host` or `host:port`) or server class
    #[arg(short, long, default_value = "127.0.0.1:32400")]
    pub server: String,

    /// Access token for the media server
    #[arg(long, default_value = "")]
    pub token: String,

    /// Path of the primary document, e.g. /library/sections
    #[arg(short, long, default_value = "")]
    pub path: String,

    /// Read the primary document from this file instead of the server
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Client device identifier
    #[arg(long, default_value = "plexconnect-cli")]
    pub device: String,

    /// Request option as name=value; may be repeated
    #[arg(short, long = "option", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// JSON object of request options
    #[arg(long)]
    pub options_json: Option<PathBuf>,

    /// JSON settings snapshot to preload
    #[arg(long)]
    pub settings_json: Option<PathBuf>,

    /// Log output: silent, development or debug
    #[arg(long, default_value = "development")]
    pub log_mode: String,
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

impl Args {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.template.trim().is_empty() {
            return Err(anyhow!("Template name must not be empty"));
        }
        if self.device.trim().is_empty() {
            return Err(anyhow!("Device identifier must not be empty"));
        }

        self.log_mode
            .parse::<LoggingMode>()
            .map_err(|_| anyhow!("Invalid log mode '{}'. Valid modes: silent, development, debug", self.log_mode))?;

        Ok(())
    }
}

/// Configuration derived from command line arguments and environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub converter: ConverterConfig,
    pub server: String,
    pub token: String,
    pub path: String,
    pub template: String,
    pub source: Option<PathBuf>,
    pub device: String,
    pub options: HashMap<String, String>,
    pub settings: Snapshot,
    pub log_mode: LoggingMode,
}

impl Config {
    /// Create configuration from command line arguments and environment variables
    pub fn from_env() -> Result<Self> {
        let mut args = Args::parse();

        if let Ok(server) = std::env::var("PLEXCONNECT_SERVER") {
            args.server = server;
        }
        if let Ok(token) = std::env::var("PLEXCONNECT_TOKEN") {
            args.token = token;
        }
        if let Ok(device) = std::env::var("PLEXCONNECT_DEVICE") {
            args.device = device;
        }
        if let Ok(log_mode) = std::env::var("PLEXCONNECT_LOG_MODE") {
            args.log_mode = log_mode;
        }

        args.validate()?;
        Self::from_args(args)
    }

    fn from_args(args: Args) -> Result<Self> {
        let mut converter = ConverterConfig::from_env().context("Invalid PLEXCONNECT_* environment variable")?;
        if let Some(dir) = args.template_dir {
            converter.template_dir = dir;
        }

        let mut options = match &args.options_json {
            Some(path) => read_json::<HashMap<String, String>>(path)?,
            None => HashMap::new(),
        };
        options.extend(args.options);
        options
            .entry("PlexConnectUDID".to_string())
            .or_insert_with(|| args.device.clone());

        let log_mode = args.log_mode.parse::<LoggingMode>()?;
        let settings = match &args.settings_json {
            Some(path) => read_json::<Snapshot>(path)?,
            None => Snapshot::default(),
        };

        Ok(Self {
            converter,
            server: args.server,
            token: args.token,
            path: args.path,
            template: args.template,
            source: args.source,
            device: args.device,
            options,
            settings,
            log_mode,
        })
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        info!("Configuration:");
        info!("  Server: {}", self.server);
        info!("  Path: {}", self.path);
        info!("  Template: {} in {}", self.template, self.converter.template_dir.display());
        info!("  Device: {}", self.device);
        match &self.source {
            Some(source) => info!("  Source file: {}", source.display()),
            None => info!("  Source: live server"),
        }
    }

    /// The configured server as a directory record
    fn server_record(&self) -> ServerRecord {
        let (address, port) = self.server.split_once(':').unwrap_or((self.server.as_str(), "32400"));
        ServerRecord {
            uuid: self.server.clone(),
            name: self.server.clone(),
            address: address.to_string(),
            port: port.to_string(),
            base_url: format!("http://{}:{}", address, port),
            access_token: self.token.clone(),
            local: true,
            owned: true,
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Gateway serving the source file, or the live server
fn build_gateway(config: &Config) -> Result<Arc<dyn ServerGateway>> {
    let record = config.server_record();

    if let Some(source) = &config.source {
        let text = std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source.display()))?;
        let document = Element::parse(text.as_bytes()).with_context(|| format!("Failed to parse {}", source.display()))?;
        debug!("Serving {} as {}", source.display(), config.path);
        let uuid = record.uuid.clone();
        return Ok(Arc::new(MemoryGateway::new().with_server(record).with_document(
            &uuid,
            &config.path,
            document,
        )));
    }

    let directory = Arc::new(ServerDirectory::new());
    directory.register(&config.device, record);
    Ok(Arc::new(PmsGateway::new(directory, PmsClient::new())))
}

fn run(config: Config) -> Result<String> {
    let gateway = build_gateway(&config)?;
    let settings = Arc::new(AtvSettings::from_snapshot(config.settings.clone()));
    let converter = Converter::new(gateway, settings, config.converter.clone());

    let mut request = ConvertRequest::new(config.server.clone(), config.path.clone(), config.template.clone());
    request.options = config.options;
    Ok(converter.convert(&request))
}

fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(config.log_mode).context("Failed to initialize logging")?;
    config.print_summary();

    let xml = run(config).context("Conversion failed")?;
    println!("{}", xml);
    Ok(())
}
