//! The option table: every known setting with its allowed values
//!
//! The first option of a choice is its default. Toggling a setting walks the
//! options in table order and wraps around.

/// Values a setting may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// One of a fixed, ordered list of options
    Choice(&'static [&'static str]),
    /// Free text with a default value
    Text(&'static str),
}

impl SettingKind {
    pub fn default_value(&self) -> &'static str {
        match self {
            SettingKind::Choice(options) => options.first().copied().unwrap_or(""),
            SettingKind::Text(default) => default,
        }
    }

    pub fn allows(&self, value: &str) -> bool {
        match self {
            SettingKind::Choice(options) => options.contains(&value),
            SettingKind::Text(_) => true,
        }
    }

    /// The option following `current`; text settings never change on toggle
    pub fn next(&self, current: &str) -> String {
        match self {
            SettingKind::Choice(options) => match options.iter().position(|o| *o == current) {
                Some(ix) => options[(ix + 1) % options.len()].to_string(),
                None => self.default_value().to_string(),
            },
            SettingKind::Text(_) => current.to_string(),
        }
    }
}

const QUALITY_TIERS_LOCAL: &[&str] = &[
    "1080p 40.0Mbps",
    "480p 2.0Mbps",
    "720p 3.0Mbps",
    "720p 4.0Mbps",
    "1080p 8.0Mbps",
    "1080p 10.0Mbps",
    "1080p 12.0Mbps",
    "1080p 20.0Mbps",
];

const QUALITY_TIERS_REMOTE: &[&str] = &[
    "720p 3.0Mbps",
    "720p 4.0Mbps",
    "1080p 8.0Mbps",
    "1080p 10.0Mbps",
    "1080p 12.0Mbps",
    "1080p 20.0Mbps",
    "1080p 40.0Mbps",
    "480p 2.0Mbps",
];

const HIDE_SHOW: &[&str] = &["Hide", "Show"];
const TRUE_FALSE: &[&str] = &["True", "False"];
const LIST_VIEWS: &[&str] = &["Grid", "List", "Detailed List"];

static TABLE: &[(&str, SettingKind)] = &[
    ("movieview", SettingKind::Choice(LIST_VIEWS)),
    ("homevideoview", SettingKind::Choice(LIST_VIEWS)),
    ("actorview", SettingKind::Choice(&["Movies", "Portrait"])),
    ("showview", SettingKind::Choice(&["Detailed List", "List", "Grid", "Bookcase"])),
    ("seasonview", SettingKind::Choice(&["List", "Coverflow"])),
    ("channelview", SettingKind::Choice(&["List", "Grid", "Bookcase"])),
    ("flattenseason", SettingKind::Choice(&["False", "True"])),
    ("durationformat", SettingKind::Choice(&["Hours/Minutes", "Minutes"])),
    ("postertitles", SettingKind::Choice(&["Highlighted Only", "Show All"])),
    ("moviefanart", SettingKind::Choice(HIDE_SHOW)),
    ("tvshowfanart", SettingKind::Choice(HIDE_SHOW)),
    ("showsynopsis", SettingKind::Choice(HIDE_SHOW)),
    ("showunwatched", SettingKind::Choice(TRUE_FALSE)),
    ("showplayerclock", SettingKind::Choice(TRUE_FALSE)),
    ("showendtime", SettingKind::Choice(TRUE_FALSE)),
    ("timeformat", SettingKind::Choice(&["24 Hour", "12 Hour"])),
    ("clockposition", SettingKind::Choice(&["Center", "Right", "Left"])),
    ("overscanadjust", SettingKind::Choice(&["0", "1", "2", "3", "-3", "-2", "-1"])),
    ("transcoderaction", SettingKind::Choice(&["Auto", "DirectPlay", "Transcode"])),
    ("transcodequality", SettingKind::Choice(QUALITY_TIERS_LOCAL)),
    ("remotebitrate", SettingKind::Choice(QUALITY_TIERS_REMOTE)),
    ("phototranscoderaction", SettingKind::Choice(&["Auto", "Transcode"])),
    ("subtitlerenderer", SettingKind::Choice(&["Auto", "iOS, PMS", "PMS"])),
    ("subtitlesize", SettingKind::Choice(&["100", "125", "150", "50", "75"])),
    ("audioboost", SettingKind::Choice(&["100", "175", "225", "300"])),
    ("myplex_user", SettingKind::Text("")),
    ("myplex_auth", SettingKind::Text("")),
];

/// Look up a setting by key
pub fn kind(key: &str) -> Option<SettingKind> {
    TABLE.iter().find(|(name, _)| *name == key).map(|(_, kind)| *kind)
}

/// All known setting keys, in table order
pub fn keys() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_first_option() {
        assert_eq!(kind("transcoderaction").map(|k| k.default_value()), Some("Auto"));
        assert_eq!(kind("transcodequality").map(|k| k.default_value()), Some("1080p 40.0Mbps"));
        assert_eq!(kind("myplex_auth").map(|k| k.default_value()), Some(""));
        assert!(kind("nonexistent").is_none());
    }

    #[test]
    fn test_next_wraps_around() {
        let renderer = kind("subtitlerenderer").unwrap();
        assert_eq!(renderer.next("Auto"), "iOS, PMS");
        assert_eq!(renderer.next("PMS"), "Auto");
        assert_eq!(renderer.next("garbage"), "Auto");
    }

    #[test]
    fn test_keys_are_unique() {
        let mut all: Vec<&str> = keys().collect();
        let before = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), before);
    }
}
