//! Message translation hook

/// Looks up the localized form of a message id
///
/// The returned string may contain `{N}` / `{N:spec}` placeholders; callers
/// fill them in afterwards.
pub trait Translator: Send + Sync {
    fn translate(&self, language: &str, msgid: &str) -> String;
}

/// Returns every message id unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn translate(&self, _language: &str, msgid: &str) -> String {
        msgid.to_string()
    }
}
