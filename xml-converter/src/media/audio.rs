use xmltree::Element;

use super::{attr, int_attr};
use crate::error::Result;

pub const AUDIO_NATIVE_CODECS: [&str; 7] = ["mp3", "aac", "ac3", "drms", "alac", "aiff", "wav"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPlan {
    Direct,
    Transcode,
}

/// Direct play for native codecs under `max_bitrate` (kbps), transcode otherwise
pub fn decide_audio(media: &Element, max_bitrate: u32) -> Result<AudioPlan> {
    let native_codec = attr(media, "audioCodec").map_or(false, |codec| AUDIO_NATIVE_CODECS.contains(&codec));
    if native_codec && int_attr(media, "bitrate")? < i64::from(max_bitrate) {
        Ok(AudioPlan::Direct)
    } else {
        Ok(AudioPlan::Transcode)
    }
}
