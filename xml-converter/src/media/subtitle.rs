use xmltree::Element;

use super::attr;
use crate::resolve::find_all;

/// The subtitle stream the user selected for a media part
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtitle {
    pub id: String,
    /// Set for external (sidecar) subtitles
    pub key: String,
    pub format: String,
}

impl Subtitle {
    /// Embedded subtitle the device renders itself
    pub fn is_device_native(&self) -> bool {
        self.key.is_empty() && self.format == "tx3g"
    }

    /// External text subtitle the bridge can serve alongside the video
    pub fn is_external_text(&self) -> bool {
        !self.key.is_empty() && self.format == "srt"
    }
}

/// First selected subtitle stream (`streamType="3" selected="1"`) of `part`
pub fn selected_subtitle(part: Option<&Element>) -> Option<Subtitle> {
    let part = part?;
    find_all(part, "Stream")
        .into_iter()
        .find(|stream| attr(stream, "streamType") == Some("3") && attr(stream, "selected") == Some("1"))
        .map(|stream| Subtitle {
            id: attr(stream, "id").unwrap_or_default().to_string(),
            key: attr(stream, "key").unwrap_or_default().to_string(),
            format: attr(stream, "format").unwrap_or_default().to_string(),
        })
}

/// Whether the video may be played directly given its subtitle
///
/// `renderer` is the `subtitlerenderer` setting.
pub fn subtitle_direct_play(subtitle: Option<&Subtitle>, renderer: &str, video_native: bool) -> bool {
    let Some(subtitle) = subtitle.filter(|s| !s.id.is_empty()) else {
        return true;
    };
    match renderer {
        "Auto" => (video_native && subtitle.is_device_native()) || subtitle.is_external_text(),
        "iOS, PMS" => video_native && subtitle.is_device_native(),
        _ => false,
    }
}
