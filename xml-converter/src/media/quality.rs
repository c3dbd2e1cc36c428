use crate::error::{ConvertError, Result};

/// Transcode limits for one quality label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTier {
    pub resolution: &'static str,
    /// Quality percentage
    pub quality: u32,
    /// Bitrate cap in kbps
    pub max_bitrate: u32,
}

const TIERS: [(&str, QualityTier); 8] = [
    ("480p 2.0Mbps", QualityTier { resolution: "720x480", quality: 60, max_bitrate: 2000 }),
    ("720p 3.0Mbps", QualityTier { resolution: "1280x720", quality: 75, max_bitrate: 3000 }),
    ("720p 4.0Mbps", QualityTier { resolution: "1280x720", quality: 100, max_bitrate: 4000 }),
    ("1080p 8.0Mbps", QualityTier { resolution: "1920x1080", quality: 60, max_bitrate: 8000 }),
    ("1080p 10.0Mbps", QualityTier { resolution: "1920x1080", quality: 75, max_bitrate: 10000 }),
    ("1080p 12.0Mbps", QualityTier { resolution: "1920x1080", quality: 90, max_bitrate: 12000 }),
    ("1080p 20.0Mbps", QualityTier { resolution: "1920x1080", quality: 100, max_bitrate: 20000 }),
    ("1080p 40.0Mbps", QualityTier { resolution: "1920x1080", quality: 100, max_bitrate: 40000 }),
];

/// Look up the limits for a quality label such as `"720p 3.0Mbps"`
pub fn tier(label: &str) -> Result<QualityTier> {
    TIERS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, tier)| *tier)
        .ok_or_else(|| ConvertError::UnknownQuality(label.to_string()))
}
