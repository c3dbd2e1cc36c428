//! Built-in template commands

mod media_url;
mod structural;
mod value;

pub use structural::{select_playlist, PlayMode};

use crate::registry::CommandRegistry;

pub(crate) fn register_builtin(registry: &mut CommandRegistry) {
    registry.register_structural("COPY", structural::copy);
    registry.register_structural("COPY_PLAYLIST", structural::copy_playlist);
    registry.register_structural("CUT", structural::cut);
    registry.register_structural("ADDXML", structural::add_xml);
    registry.register_structural("VAR", structural::var);

    registry.register_value("VAL", value::val);
    registry.register_value("VAL_QUOTED", value::val_quoted);
    registry.register_value("EVAL", value::eval);
    registry.register_value("SETTING", value::setting);
    registry.register_value("ADDPATH", value::add_path);
    registry.register_value("URL", value::url);
    registry.register_value("episodestring", value::episode_string);
    registry.register_value("durationToString", value::duration_to_string);
    registry.register_value("contentRating", value::content_rating);
    registry.register_value("unwatchedCountGrid", value::unwatched_count_grid);
    registry.register_value("unwatchedCountList", value::unwatched_count_list);
    registry.register_value("TEXT", value::text);
    registry.register_value("PMSCOUNT", value::pms_count);
    registry.register_value("PMSNAME", value::pms_name);

    registry.register_value("VIDEOURL", media_url::video_url);
    registry.register_value("MUSICURL", media_url::music_url);
    registry.register_value("IMAGEURL", media_url::image_url);
}
