use xmltree::Element;

use super::quality::{tier, QualityTier};
use super::subtitle::{selected_subtitle, subtitle_direct_play};
use super::{attr, int_attr};
use crate::error::Result;
use crate::resolve::{find_all, find_child};

const NATIVE_PROTOCOL: &str = "hls";
const NATIVE_CONTAINERS: [&str; 2] = ["mov", "mp4"];
const NATIVE_VIDEO_CODECS: [&str; 3] = ["mpeg4", "h264", "drmi"];
const NATIVE_AUDIO_CODECS: [&str; 3] = ["aac", "ac3", "drms"];
const MAX_NATIVE_REF_FRAMES: i64 = 8;

/// The `transcoderaction` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscoderAction {
    Auto,
    DirectPlay,
    Transcode,
}

impl TranscoderAction {
    /// Unrecognized values behave like `Auto`
    pub fn from_setting(value: &str) -> Self {
        match value {
            "DirectPlay" => TranscoderAction::DirectPlay,
            "Transcode" => TranscoderAction::Transcode,
            _ => TranscoderAction::Auto,
        }
    }
}

/// Device settings that influence video delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    pub action: TranscoderAction,
    /// `transcodequality` for local servers, `remotebitrate` otherwise
    pub quality: String,
    /// `subtitlerenderer`
    pub subtitle_renderer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoPlan {
    /// Play the part file as-is; `indirect` media needs one more lookup
    Direct { indirect: bool },
    Transcode {
        tier: QualityTier,
        /// Let the server copy compatible streams
        direct_stream: bool,
        /// Leave the selected subtitle to the device
        skip_subtitles: bool,
    },
}

/// Whether the device can play `media` without help
///
/// HLS is always native. Otherwise container and both codecs must be
/// supported, and no video stream may use High 10 or more than 8 reference
/// frames.
pub fn is_native_video(media: &Element) -> Result<bool> {
    let is = |name: &str, allowed: &[&str]| attr(media, name).map_or(false, |v| allowed.contains(&v));

    let mut native = attr(media, "protocol") == Some(NATIVE_PROTOCOL)
        || (is("container", &NATIVE_CONTAINERS)
            && is("videoCodec", &NATIVE_VIDEO_CODECS)
            && is("audioCodec", &NATIVE_AUDIO_CODECS));

    if let Some(part) = find_child(media, "Part") {
        for stream in find_all(part, "Stream") {
            if attr(stream, "streamType") != Some("1") {
                continue;
            }
            if attr(stream, "profile") == Some("high 10") || int_attr(stream, "refFrames")? > MAX_NATIVE_REF_FRAMES {
                native = false;
            }
        }
    }

    Ok(native)
}

/// Decide how to deliver `media`
pub fn decide_video(media: &Element, settings: &PlaybackSettings) -> Result<VideoPlan> {
    let native = is_native_video(media)?;
    let tier = tier(&settings.quality)?;

    let subtitle = selected_subtitle(find_child(media, "Part"));
    let subtitle_ok = subtitle_direct_play(subtitle.as_ref(), &settings.subtitle_renderer, native);

    let direct = match settings.action {
        TranscoderAction::DirectPlay => true,
        TranscoderAction::Auto => {
            native && int_attr(media, "bitrate")? < i64::from(tier.max_bitrate) && subtitle_ok
        }
        TranscoderAction::Transcode => false,
    };

    if direct {
        let indirect = attr(media, "indirect").map_or(false, |v| !v.is_empty());
        Ok(VideoPlan::Direct { indirect })
    } else {
        Ok(VideoPlan::Transcode {
            tier,
            direct_stream: settings.action != TranscoderAction::Transcode,
            skip_subtitles: subtitle_ok,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn media(xml: &str) -> Element {
        Element::parse(xml.as_bytes()).unwrap()
    }

    fn settings(action: TranscoderAction) -> PlaybackSettings {
        PlaybackSettings {
            action,
            quality: "1080p 8.0Mbps".to_string(),
            subtitle_renderer: "Auto".to_string(),
        }
    }

    #[rstest]
    #[case(r#"<Media protocol="hls" container="mkv" videoCodec="hevc" audioCodec="dts"/>"#, true)]
    #[case(r#"<Media container="mp4" videoCodec="h264" audioCodec="aac"/>"#, true)]
    #[case(r#"<Media container="mkv" videoCodec="h264" audioCodec="aac"/>"#, false)]
    #[case(r#"<Media container="mov" videoCodec="h264" audioCodec="dts"/>"#, false)]
    #[case(r#"<Media/>"#, false)]
    #[case(
        r#"<Media container="mp4" videoCodec="h264" audioCodec="aac"><Part><Stream streamType="1" profile="high 10"/></Part></Media>"#,
        false
    )]
    #[case(
        r#"<Media container="mp4" videoCodec="h264" audioCodec="aac"><Part><Stream streamType="1" refFrames="9"/></Part></Media>"#,
        false
    )]
    #[case(
        r#"<Media container="mp4" videoCodec="h264" audioCodec="aac"><Part><Stream streamType="1" refFrames="4"/><Stream streamType="2" profile="high 10"/></Part></Media>"#,
        true
    )]
    fn test_is_native_video(#[case] xml: &str, #[case] expected: bool) {
        assert_eq!(is_native_video(&media(xml)).unwrap(), expected);
    }

    #[test]
    fn test_auto_direct_play_under_cap() {
        let m = media(r#"<Media container="mp4" videoCodec="h264" audioCodec="aac" bitrate="4000"/>"#);
        assert_eq!(decide_video(&m, &settings(TranscoderAction::Auto)).unwrap(), VideoPlan::Direct { indirect: false });
    }

    #[rstest]
    #[case(r#"indirect="1""#, true)]
    #[case(r#"indirect="0""#, true)]
    #[case(r#"indirect="""#, false)]
    #[case("", false)]
    fn test_any_indirect_value_marks_indirect(#[case] attribute: &str, #[case] indirect: bool) {
        let m = media(&format!(r#"<Media container="mp4" videoCodec="h264" audioCodec="aac" {}/>"#, attribute));
        assert_eq!(
            decide_video(&m, &settings(TranscoderAction::DirectPlay)).unwrap(),
            VideoPlan::Direct { indirect }
        );
    }

    #[test]
    fn test_auto_transcodes_over_cap() {
        let m = media(r#"<Media container="mp4" videoCodec="h264" audioCodec="aac" bitrate="9000"/>"#);
        let plan = decide_video(&m, &settings(TranscoderAction::Auto)).unwrap();
        assert!(matches!(plan, VideoPlan::Transcode { direct_stream: true, skip_subtitles: true, .. }));
    }

    #[test]
    fn test_forced_modes() {
        let m = media(r#"<Media container="mkv" videoCodec="hevc" audioCodec="dts" indirect="1"/>"#);
        assert_eq!(
            decide_video(&m, &settings(TranscoderAction::DirectPlay)).unwrap(),
            VideoPlan::Direct { indirect: true }
        );

        let m = media(r#"<Media container="mp4" videoCodec="h264" audioCodec="aac" bitrate="100"/>"#);
        match decide_video(&m, &settings(TranscoderAction::Transcode)).unwrap() {
            VideoPlan::Transcode { tier, direct_stream, .. } => {
                assert!(!direct_stream);
                assert_eq!(tier.max_bitrate, 8000);
            }
            other => panic!("expected transcode, got {:?}", other),
        }
    }

    #[test]
    fn test_burned_subtitle_forces_transcode() {
        let m = media(
            r#"<Media container="mp4" videoCodec="h264" audioCodec="aac" bitrate="100">
                 <Part><Stream streamType="3" id="5" format="ass" selected="1"/></Part>
               </Media>"#,
        );
        let plan = decide_video(&m, &settings(TranscoderAction::Auto)).unwrap();
        assert!(matches!(plan, VideoPlan::Transcode { skip_subtitles: false, .. }));
    }

    #[test]
    fn test_unknown_quality_label() {
        let m = media(r#"<Media container="mp4"/>"#);
        let mut s = settings(TranscoderAction::Auto);
        s.quality = "8K".to_string();
        assert!(decide_video(&m, &s).is_err());
    }
}
