//! Direct-play versus transcode decisions
//!
//! These functions only read media descriptors and settings values and return
//! a plan. Turning a plan into a URL (tokens, server addresses, indirect
//! lookups) happens in the media URL commands.

mod audio;
mod image;
mod quality;
mod subtitle;
mod video;

pub use audio::{decide_audio, AudioPlan, AUDIO_NATIVE_CODECS};
pub use image::{decide_image, ImagePlan, IMAGE_NATIVE_EXTENSIONS};
pub use quality::{tier, QualityTier};
pub use subtitle::{selected_subtitle, subtitle_direct_play, Subtitle};
pub use video::{decide_video, is_native_video, PlaybackSettings, TranscoderAction, VideoPlan};

use xmltree::Element;

use crate::error::{ConvertError, Result};

pub const VIDEO_ELEMENT_NOT_FOUND: &str = "VIDEO_ELEMENT_NOT_FOUND";
pub const MEDIA_ELEMENT_NOT_FOUND: &str = "MEDIA_ELEMENT_NOT_FOUND";
pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";

pub(crate) fn attr<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element.attributes.get(name).map(String::as_str)
}

/// Integer attribute; absent reads as 0
pub(crate) fn int_attr(element: &Element, name: &str) -> Result<i64> {
    match attr(element, name) {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConvertError::InvalidNumber(value.to_string())),
    }
}

/// Split an inline `PMS(<address>)` marker off a key
///
/// Returns the address and the part of the key after the marker.
pub fn split_server_marker(key: &str) -> Option<(&str, &str)> {
    let start = key.find("PMS(")?;
    let end = start + key[start..].find(')')?;
    Some((&key[start + 4..end], &key[end + 1..]))
}

pub fn is_external(key: &str) -> bool {
    key.starts_with("http://") || key.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_server_marker() {
        assert_eq!(
            split_server_marker("PMS(10.0.0.2)/library/metadata/1/thumb"),
            Some(("10.0.0.2", "/library/metadata/1/thumb"))
        );
        assert_eq!(split_server_marker("/library/metadata/1"), None);
        assert_eq!(split_server_marker("PMS(unterminated"), None);
    }

    #[test]
    fn test_int_attr() {
        let el = Element::parse(r#"<Media bitrate="1500" bad="fast"/>"#.as_bytes()).unwrap();
        assert_eq!(int_attr(&el, "bitrate").unwrap(), 1500);
        assert_eq!(int_attr(&el, "missing").unwrap(), 0);
        assert!(matches!(int_attr(&el, "bad"), Err(ConvertError::InvalidNumber(_))));
    }
}
