//! Commands that produce replacement text

use url::form_urlencoded;

use crate::context::{Expansion, Source};
use crate::error::{ConvertError, Result};
use crate::expr::{apply_math, evaluate, FormatArg};
use crate::media::{is_external, split_server_marker};
use crate::resolve::split_param;

const NO_SERVER: &str = "No Server in Proximity";

fn parse_int(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConvertError::InvalidNumber(value.to_string()))
}

/// `VAL(key[:default][:conversion])`
pub(crate) fn val(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    cx.value_of(src, arg)
}

/// `VAL_QUOTED(...)`: as `VAL`, form-URL-encoded
pub(crate) fn val_quoted(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let value = cx.value_of(src, arg)?;
    Ok(form_urlencoded::byte_serialize(value.as_bytes()).collect())
}

/// `EVAL(expression)` or `EVAL(value:math[:format])`
///
/// The plain form fails on a bad expression; the second form falls back to
/// `value` unchanged.
pub(crate) fn eval(_cx: &mut Expansion<'_>, _src: &Source, arg: &str) -> Result<String> {
    let (value, rest) = split_param(arg);
    if rest.is_empty() {
        return Ok(evaluate(&value)?.to_string());
    }
    let (math, rest) = split_param(rest);
    let (format, _) = split_param(rest);
    Ok(apply_math(&value, &math, &format))
}

/// `SETTING(name)`
pub(crate) fn setting(cx: &mut Expansion<'_>, _src: &Source, arg: &str) -> Result<String> {
    let (name, _) = split_param(arg);
    Ok(cx.setting(&name))
}

/// `ADDPATH(key)`: the key as a server path
pub(crate) fn add_path(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let key = cx.get_key(src, arg)?.value;
    if key.starts_with('/') {
        Ok(key)
    } else if key.is_empty() {
        Ok(cx.base_path(&src.alias)?.to_string())
    } else {
        Ok(format!("{}/{}", cx.base_path(&src.alias)?, key))
    }
}

/// `URL(key)`: address of a server resource routed through the bridge
pub(crate) fn url(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let raw = cx.get_key(src, arg)?.value;
    let (mark, key) = match split_server_marker(&raw) {
        Some((address, rest)) => (format!("/PMS({})", address), rest.to_string()),
        None => (format!("/PMS({})", cx.server.address), raw.clone()),
    };
    let base = &cx.services.config.base_url;

    let url = if key.ends_with(".js") {
        format!("{}{}", base, key)
    } else if is_external(&key) {
        key
    } else if key.starts_with('/') {
        format!("{}{}{}", base, mark, key)
    } else if key.is_empty() {
        format!("{}{}{}", base, mark, cx.base_path(&src.alias)?)
    } else {
        format!("{}{}{}/{}", base, mark, cx.base_path(&src.alias)?, key)
    };
    Ok(url)
}

/// `episodestring(season-key:episode-key:title-key)`
pub(crate) fn episode_string(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let season = cx.get_key(src, arg)?;
    let episode = cx.get_key(src, season.leftover)?;
    let title = cx.get_key(src, episode.leftover)?;
    cx.tr(
        "{0:0d}x{1:02d} {2}",
        &[
            FormatArg::from(parse_int(&season.value)?),
            FormatArg::from(parse_int(&episode.value)?),
            FormatArg::from(title.value),
        ],
    )
}

/// `durationToString(type-key:duration-key)`, duration in milliseconds
pub(crate) fn duration_to_string(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let kind = cx.get_key(src, arg)?;
    let duration = cx.get_key(src, kind.leftover)?.value;
    if duration.is_empty() {
        return Ok(String::new());
    }
    let millis = parse_int(&duration)?;

    match kind.value.as_str() {
        "Video" => {
            let minutes = millis.div_euclid(60_000);
            if cx.setting("durationformat") == "Minutes" || minutes < 60 {
                cx.tr("{0:d} Minutes", &[FormatArg::from(minutes)])
            } else {
                cx.tr(
                    "{0:d}hr {1:d}min",
                    &[FormatArg::from(minutes / 60), FormatArg::from(minutes % 60)],
                )
            }
        }
        "Audio" => {
            let seconds = millis.div_euclid(1000);
            cx.tr(
                "{0:d}:{1:0>2d}",
                &[FormatArg::from(seconds.div_euclid(60)), FormatArg::from(seconds.rem_euclid(60))],
            )
        }
        _ => Ok(String::new()),
    }
}

/// `contentRating(key)`: `"de/16"` becomes `"16"`
pub(crate) fn content_rating(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let rating = cx.get_key(src, arg)?.value;
    Ok(match rating.split('/').nth(1) {
        Some(local) => local.to_string(),
        None => rating,
    })
}

fn unwatched(cx: &Expansion<'_>, src: &Source, arg: &str) -> Result<i64> {
    let total = cx.get_key(src, arg)?;
    let viewed = cx.get_key(src, total.leftover)?;
    Ok(parse_int(&total.value)? - parse_int(&viewed.value)?)
}

/// `unwatchedCountGrid(total-key:viewed-key)`
pub(crate) fn unwatched_count_grid(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    Ok(unwatched(cx, src, arg)?.to_string())
}

/// `unwatchedCountList(total-key:viewed-key)`
pub(crate) fn unwatched_count_list(cx: &mut Expansion<'_>, src: &Source, arg: &str) -> Result<String> {
    let count = unwatched(cx, src, arg)?;
    if count > 0 {
        cx.tr("{0} unwatched", &[FormatArg::from(count)])
    } else {
        Ok(String::new())
    }
}

/// `TEXT(message)`
pub(crate) fn text(cx: &mut Expansion<'_>, _src: &Source, arg: &str) -> Result<String> {
    Ok(cx.translate(arg))
}

/// `PMSCOUNT()`
pub(crate) fn pms_count(cx: &mut Expansion<'_>, _src: &Source, _arg: &str) -> Result<String> {
    Ok(cx.services.gateway.server_count(&cx.device_id).to_string())
}

/// `PMSNAME()`
pub(crate) fn pms_name(cx: &mut Expansion<'_>, _src: &Source, _arg: &str) -> Result<String> {
    if cx.server.name.is_empty() {
        Ok(NO_SERVER.to_string())
    } else {
        Ok(cx.server.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::Fixture;
    use crate::expand::expand_line;
    use atv_settings::SettingsStore;
    use rstest::rstest;

    const DOC: &str = r#"<MediaContainer key="/library/metadata/5/children" parentIndex="2" index="7"
        title="Pilot &amp; More" duration="5430000" short="754000" contentRating="de/16" rating="PG"
        leafCount="10" viewedLeafCount="4" allViewed="10" art="PMS(10.0.0.9)/library/metadata/5/art"
        script="/js/main.js" web="https://example.com/page"/>"#;

    fn line(fx: &Fixture, text: &str) -> String {
        let mut cx = fx.expansion(DOC, "/library/metadata/5");
        let src = cx.main_source().unwrap();
        expand_line(&mut cx, &src, text).unwrap()
    }

    #[rstest]
    #[case("{{VAL(title)}}", "Pilot & More")]
    #[case("{{VAL_QUOTED(title)}}", "Pilot+%26+More")]
    #[case("{{EVAL(2+3*4)}}", "14")]
    #[case("{{EVAL({{VAL(duration)}}:x/60000:03d)}}", "090")]
    #[case("{{EVAL(abc:x+1)}}", "abc")]
    #[case("{{SETTING(transcoderaction)}}", "Auto")]
    #[case("{{ADDPATH(key)}}", "/library/metadata/5/children")]
    #[case("{{ADDPATH(missing)}}", "/library/metadata/5")]
    #[case("{{ADDPATH(missing:extras)}}", "/library/metadata/5/extras")]
    #[case("{{episodestring(parentIndex:index:title)}}", "2x07 Pilot & More")]
    #[case("{{contentRating(contentRating)}}", "16")]
    #[case("{{contentRating(rating)}}", "PG")]
    #[case("{{unwatchedCountGrid(leafCount:viewedLeafCount)}}", "6")]
    #[case("{{unwatchedCountList(leafCount:viewedLeafCount)}}", "6 unwatched")]
    #[case("{{unwatchedCountList(leafCount:allViewed)}}", "")]
    #[case("{{unwatchedCountGrid(title:viewedLeafCount)}}", "((ERROR:unwatchedCountGrid))")]
    #[case("{{TEXT(Movies)}}", "Movies")]
    #[case("{{PMSCOUNT()}}", "1")]
    #[case("{{PMSNAME()}}", "Living Room")]
    fn test_value_commands(#[case] text: &str, #[case] expected: &str) {
        let fx = Fixture::new();
        assert_eq!(line(&fx, text), expected);
    }

    #[rstest]
    #[case("{{URL(key)}}", "http://trailers.apple.com/PMS(10.0.0.5)/library/metadata/5/children")]
    #[case("{{URL(art)}}", "http://trailers.apple.com/PMS(10.0.0.9)/library/metadata/5/art")]
    #[case("{{URL(script)}}", "http://trailers.apple.com/js/main.js")]
    #[case("{{URL(web)}}", "https://example.com/page")]
    #[case("{{URL(missing)}}", "http://trailers.apple.com/PMS(10.0.0.5)/library/metadata/5")]
    #[case("{{URL(missing:similar)}}", "http://trailers.apple.com/PMS(10.0.0.5)/library/metadata/5/similar")]
    fn test_url(#[case] text: &str, #[case] expected: &str) {
        let fx = Fixture::new();
        assert_eq!(line(&fx, text), expected);
    }

    #[rstest]
    #[case("Video", "duration", "Hours/Minutes", "1hr 30min")]
    #[case("Video", "duration", "Minutes", "90 Minutes")]
    #[case("Video", "short", "Hours/Minutes", "12 Minutes")]
    #[case("Audio", "short", "Hours/Minutes", "12:34")]
    #[case("Photo", "short", "Hours/Minutes", "")]
    #[case("Video", "missing", "Hours/Minutes", "")]
    fn test_duration_to_string(#[case] kind: &str, #[case] key: &str, #[case] format: &str, #[case] expected: &str) {
        let fx = Fixture::new();
        fx.settings.set_setting("atv-1", "durationformat", format).unwrap();
        let text = format!("{{{{durationToString(^kind:{}:{})}}}}", kind, key);
        assert_eq!(line(&fx, &text), expected);
    }

    #[test]
    fn test_pms_name_without_server() {
        let fx = Fixture::new();
        let main = xmltree::Element::parse(DOC.as_bytes()).unwrap();
        let mut cx = Expansion::new(fx.services(), "atv-1", "owned", Default::default(), main, "/");
        let src = cx.main_source().unwrap();
        assert_eq!(expand_line(&mut cx, &src, "{{PMSNAME()}}").unwrap(), NO_SERVER);
    }
}
