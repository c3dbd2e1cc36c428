//! Playback path builders
//!
//! These functions turn a media key from a server document into the request
//! path a client device should use: either the original file (direct play)
//! or a server-side transcoding session. They are pure string builders and
//! never touch the network.

use url::form_urlencoded::Serializer;

/// Transcode session endpoints on the media server
pub const VIDEO_TRANSCODE_PATH: &str = "/video/:/transcode/universal/start.m3u8";
pub const AUDIO_TRANSCODE_PATH: &str = "/music/:/transcode/universal/start.mp3";
pub const IMAGE_TRANSCODE_PATH: &str = "/photo/:/transcode";

/// Loopback address the server uses to read its own images while transcoding
const SERVER_LOOPBACK: &str = "http://127.0.0.1:32400";

const CLIENT_CAPABILITIES: &str = "protocols=http-live-streaming,http-mp4-streaming,http-streaming-video,http-streaming-video-720p,http-mp4-video,http-mp4-video-720p;videoDecoders=h264{profile:high&resolution:1080&level:41};audioDecoders=mp3,aac{bitrate:160000}";

const CLIENT_PROFILE_EXTRA: &str = "add-transcode-target(type=MusicProfile&context=streaming&protocol=hls&container=mpegts&audioCodec=aac)+add-transcode-target(type=videoProfile&context=streaming&protocol=hls&container=mpegts&audioCodec=ac3&videoCodec=h264)";

/// Identity of the requesting client device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Stable device identifier, sent as `X-Plex-Client-Identifier`
    pub client_id: Option<String>,
    /// User-visible device name, sent as `X-Plex-Device-Name`
    pub device_name: Option<String>,
}

impl ClientIdentity {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            device_name: None,
        }
    }

    /// The `X-Plex-*` device arguments, in a stable order
    pub fn header_pairs(&self, product: &str, version: &str) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("X-Plex-Device", "AppleTV".to_string()),
            ("X-Plex-Model", "3,1".to_string()),
        ];
        if let Some(id) = &self.client_id {
            pairs.push(("X-Plex-Client-Identifier", id.clone()));
        }
        if let Some(name) = &self.device_name {
            pairs.push(("X-Plex-Device-Name", name.clone()));
        }
        pairs.push(("X-Plex-Platform", "iOS".to_string()));
        pairs.push(("X-Plex-Client-Platform", "iOS".to_string()));
        pairs.push(("X-Plex-Client-Profile-Extra", CLIENT_PROFILE_EXTRA.to_string()));
        pairs.push(("X-Plex-Product", product.to_string()));
        pairs.push(("X-Plex-Version", version.to_string()));
        pairs
    }
}

/// Limits and flags of a video transcoding request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTranscode {
    /// Target resolution, e.g. `1280x720`
    pub resolution: String,
    /// Quality percentage
    pub quality: String,
    /// Bitrate cap in kbps
    pub max_bitrate: String,
    /// Allow the server to copy compatible streams instead of re-encoding
    pub direct_stream: bool,
    pub subtitle_size: String,
    /// Leave the selected subtitle to the client instead of burning it in
    pub skip_subtitles: bool,
    pub audio_boost: String,
    pub part_index: usize,
}

fn is_external(key: &str) -> bool {
    key.starts_with("http://") || key.starts_with("https://")
}

fn encode<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

fn device_query(identity: &ClientIdentity, product: &str, version: &str, token: &str) -> String {
    let pairs = identity.header_pairs(product, version);
    let mut serializer = Serializer::new(String::new());
    for (name, value) in &pairs {
        serializer.append_pair(name, value);
    }
    if !token.is_empty() {
        serializer.append_pair("X-Plex-Token", token);
    }
    serializer.finish()
}

/// Join a key onto a server base address and base path
///
/// External `http(s)://` keys are returned unchanged, absolute keys are
/// appended to `base_url`, an empty key resolves to the base path itself and
/// anything else is treated as relative to `path`.
pub fn get_url(base_url: &str, path: &str, key: &str) -> String {
    if is_external(key) {
        key.to_string()
    } else if key.starts_with('/') {
        format!("{}{}", base_url, key)
    } else if key.is_empty() {
        format!("{}{}", base_url, path)
    } else {
        format!("{}{}/{}", base_url, path, key)
    }
}

/// Path for playing a media part as-is
///
/// Used for video, audio and image keys alike. The access token is appended
/// as a query argument unless the key points to an external server.
pub fn direct_path(key: &str, token: &str) -> String {
    if is_external(key) || token.is_empty() {
        return key.to_string();
    }
    let separator = if key.contains('?') { '&' } else { '?' };
    format!("{}{}{}", key, separator, encode([("X-Plex-Token", token)]))
}

/// Path that starts an HLS video transcoding session for `key`
pub fn transcode_video_path(
    key: &str,
    token: &str,
    identity: &ClientIdentity,
    version: &str,
    params: &VideoTranscode,
) -> String {
    let session = identity.client_id.clone().unwrap_or_default();
    let part_index = params.part_index.to_string();
    let args = encode([
        ("session", session.as_str()),
        ("protocol", "hls"),
        ("videoResolution", params.resolution.as_str()),
        ("maxVideoBitrate", params.max_bitrate.as_str()),
        ("videoQuality", params.quality.as_str()),
        ("directStream", if params.direct_stream { "1" } else { "0" }),
        ("subtitleSize", params.subtitle_size.as_str()),
        ("skipSubtitles", if params.skip_subtitles { "1" } else { "0" }),
        ("audioBoost", params.audio_boost.as_str()),
        ("fastSeek", "1"),
        ("path", key),
        ("partIndex", part_index.as_str()),
    ]);
    let capabilities = encode([("X-Plex-Client-Capabilities", CLIENT_CAPABILITIES)]);
    format!(
        "{}?{}&{}&{}",
        VIDEO_TRANSCODE_PATH,
        args,
        device_query(identity, "PlexConnect", version, token),
        capabilities
    )
}

/// Path that starts an mp3 audio transcoding session for `key`
pub fn transcode_audio_path(
    key: &str,
    token: &str,
    identity: &ClientIdentity,
    version: &str,
    max_bitrate: u32,
) -> String {
    let session = identity.client_id.clone().unwrap_or_default();
    let max_bitrate = max_bitrate.to_string();
    let args = encode([
        ("path", key),
        ("session", session.as_str()),
        ("protocol", "http"),
        ("maxAudioBitrate", max_bitrate.as_str()),
    ]);
    format!(
        "{}?{}&{}",
        AUDIO_TRANSCODE_PATH,
        args,
        device_query(identity, "PlexConnect", version, token)
    )
}

/// Path that asks the server to scale an image to `width`x`height`
///
/// The server fetches the source image itself, so relative and absolute keys
/// are rewritten against its loopback address.
pub fn transcode_image_path(key: &str, token: &str, path: &str, width: &str, height: &str) -> String {
    let source = if is_external(key) {
        key.to_string()
    } else if key.starts_with('/') {
        format!("{}{}", SERVER_LOOPBACK, key)
    } else {
        format!("{}{}/{}", SERVER_LOOPBACK, path, key)
    };

    let mut serializer = Serializer::new(String::new());
    serializer.append_pair("width", width);
    serializer.append_pair("height", height);
    serializer.append_pair("url", &source);
    if !token.is_empty() {
        serializer.append_pair("X-Plex-Token", token);
    }
    format!("{}?{}", IMAGE_TRANSCODE_PATH, serializer.finish())
}
