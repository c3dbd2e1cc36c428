pub const IMAGE_NATIVE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "tif", "tiff", "gif", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePlan {
    Direct,
    Transcode,
}

fn extension(key: &str) -> Option<String> {
    key.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Pass an image through untouched or have the server scale it
///
/// `width` is the size requested by the template (empty for none) and
/// `action` the `phototranscoderaction` setting.
pub fn decide_image(key: &str, width: &str, action: &str) -> ImagePlan {
    let native = extension(key).map_or(false, |ext| IMAGE_NATIVE_EXTENSIONS.contains(&ext.as_str()));
    if width.is_empty() && action == "Auto" && native {
        ImagePlan::Direct
    } else {
        ImagePlan::Transcode
    }
}
