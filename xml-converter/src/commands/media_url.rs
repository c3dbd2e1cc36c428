//! `VIDEOURL`, `MUSICURL` and `IMAGEURL`

use pms_client::paths::{direct_path, transcode_audio_path, transcode_image_path, transcode_video_path};
use pms_client::{get_url, ClientIdentity, VideoTranscode};
use tracing::{info, warn};
use xmltree::Element;

use crate::context::{server_or_empty, Expansion, Source};
use crate::error::{ConvertError, Result};
use crate::media::{
    attr, decide_audio, decide_image, decide_video, split_server_marker, AudioPlan, ImagePlan, PlaybackSettings,
    TranscoderAction, VideoPlan, FILE_NOT_FOUND, MEDIA_ELEMENT_NOT_FOUND, VIDEO_ELEMENT_NOT_FOUND,
};
use crate::resolve::{child_elements, find_child, split_param};

/// Attribute at `steps/.../name` below `element`, empty when absent
fn attribute_at(element: &Element, path: &str) -> String {
    let (steps, name) = path.rsplit_once('/').unwrap_or(("", path));
    let mut current = Some(element);
    for step in steps.split('/').filter(|s| !s.is_empty()) {
        current = current.and_then(|el| find_child(el, step));
    }
    current
        .and_then(|el| attr(el, name))
        .unwrap_or_default()
        .to_string()
}

/// Elements without children are not complete media descriptors
fn has_children(element: &Element) -> bool {
    child_elements(element).next().is_some()
}

impl Expansion<'_> {
    fn identity(&self) -> ClientIdentity {
        ClientIdentity::new(self.device_id.clone())
    }

    fn playback_settings(&self) -> PlaybackSettings {
        let quality = if self.server.local { "transcodequality" } else { "remotebitrate" };
        PlaybackSettings {
            action: TranscoderAction::from_setting(&self.setting("transcoderaction")),
            quality: self.setting(quality),
            subtitle_renderer: self.setting("subtitlerenderer"),
        }
    }
}

/// `VIDEOURL(video-path[:part-index-key[:default]])`
pub(crate) fn video_url(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let (video, leftover) = cx.get_element(src, arg)?;
    let part_index = cx.get_key(src, leftover)?.value;
    let part_index: usize = if part_index.is_empty() {
        0
    } else {
        part_index
            .trim()
            .parse()
            .map_err(|_| ConvertError::InvalidNumber(part_index.clone()))?
    };

    let Some(video) = video.filter(has_children) else {
        warn!("VIDEOURL: video element not found: {}", arg);
        return Ok(VIDEO_ELEMENT_NOT_FOUND.to_string());
    };
    let Some(media) = find_child(&video, "Media") else {
        warn!("VIDEOURL: media element not found: {}", arg);
        return Ok(MEDIA_ELEMENT_NOT_FOUND.to_string());
    };

    let token = cx.server.access_token.clone();
    let path = match decide_video(media, &cx.playback_settings())? {
        VideoPlan::Direct { indirect } => {
            let mut key = attribute_at(media, &format!("Part[{}]/key", part_index + 1));
            if indirect {
                let redirect = cx.services.gateway.fetch_document(&cx.device_id, &cx.server, &key)?;
                key = attribute_at(&redirect, &format!("Video/Media/Part[{}]/key", part_index + 1));
            }
            direct_path(&key, &token)
        }
        VideoPlan::Transcode { tier, direct_stream, skip_subtitles } => {
            let params = VideoTranscode {
                resolution: tier.resolution.to_string(),
                quality: tier.quality.to_string(),
                max_bitrate: tier.max_bitrate.to_string(),
                direct_stream,
                subtitle_size: cx.setting("subtitlesize"),
                skip_subtitles,
                audio_boost: cx.setting("audioboost"),
                part_index,
            };
            transcode_video_path(
                attr(&video, "key").unwrap_or_default(),
                &token,
                &cx.identity(),
                &cx.services.config.client_version,
                &params,
            )
        }
    };

    let url = get_url(&cx.server.base_url, cx.base_path(&src.alias)?, &path);
    info!("Video URL: {}", url);
    Ok(url)
}

/// `MUSICURL(track-path)`
pub(crate) fn music_url(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let (track, _) = cx.get_element(src, arg)?;
    let token = cx.server.access_token.clone();

    let path = match track.filter(has_children) {
        None => {
            let key = cx.get_key(src, arg)?.value;
            direct_path(&key, &token)
        }
        Some(track) => match find_child(&track, "Media") {
            None => {
                warn!("MUSICURL: media element not found: {}", arg);
                return Ok(FILE_NOT_FOUND.to_string());
            }
            Some(media) => {
                let max_bitrate = cx.services.config.max_audio_bitrate;
                match decide_audio(media, max_bitrate)? {
                    AudioPlan::Direct => direct_path(&attribute_at(media, "Part/key"), &token),
                    AudioPlan::Transcode => transcode_audio_path(
                        attr(&track, "key").unwrap_or_default(),
                        &token,
                        &cx.identity(),
                        &cx.services.config.client_version,
                        max_bitrate,
                    ),
                }
            }
        },
    };

    let url = get_url(&cx.server.base_url, cx.base_path(&src.alias)?, &path);
    info!("Music URL: {}", url);
    Ok(url)
}

/// `IMAGEURL(key[:default]:width[:height])`
pub(crate) fn image_url(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let key = cx.get_key(src, arg)?;
    let (width, rest) = split_param(key.leftover);
    let (height, _) = split_param(rest);
    let height = if height.is_empty() { width.clone() } else { height };

    let (server, key) = match split_server_marker(&key.value) {
        Some((address, rest)) => (
            server_or_empty(cx.services.gateway, &cx.device_id, address),
            rest.to_string(),
        ),
        None => (cx.server.clone(), key.value.clone()),
    };
    let base_path = cx.base_path(&src.alias)?;

    let path = match decide_image(&key, &width, &cx.setting("phototranscoderaction")) {
        ImagePlan::Direct => direct_path(&key, &server.access_token),
        ImagePlan::Transcode => {
            let (default_width, default_height) = cx.services.config.default_image_size;
            let width = if width.is_empty() { default_width.to_string() } else { width };
            let height = if height.is_empty() { default_height.to_string() } else { height };
            transcode_image_path(&key, &server.access_token, base_path, &width, &height)
        }
    };

    Ok(get_url(&server.base_url, base_path, &path))
}
