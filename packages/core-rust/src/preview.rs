//! Inline preview eligibility for blob files.

/// Files at or above this size are never fetched for preview (30 MiB).
pub const DEFAULT_PREVIEW_CEILING: u64 = 30 * 1024 * 1024;

/// Text-like extensions that may be previewed inline.
pub const DEFAULT_PREVIEW_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "csv", "tsv", "log", "xml", "yaml", "yml", "toml", "ini", "cfg",
    "conf", "html", "htm", "css", "js", "ts", "py", "rs", "sh", "sql",
];

/// Why a file cannot be previewed inline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewRejection {
    /// The extension is missing or not in the allow-list.
    #[error("preview not available for this file type")]
    Extension(Option<String>),
    /// The file is at or above the size ceiling.
    #[error("file too large to preview ({size} bytes, limit {ceiling})")]
    TooLarge { size: u64, ceiling: u64 },
    /// The file record carries no usable length.
    #[error("file size unknown, preview not available")]
    UnknownSize,
}

/// Client-side preview rules, checked before any body is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPolicy {
    pub ceiling: u64,
    pub extensions: Vec<String>,
}

impl Default for PreviewPolicy {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_PREVIEW_CEILING,
            extensions: DEFAULT_PREVIEW_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
        }
    }
}

impl PreviewPolicy {
    /// Checks both the extension and the size of a file. A file of unknown
    /// size is never eligible.
    ///
    /// # Errors
    ///
    /// Returns the first failed rule.
    pub fn check(&self, filename: &str, size: Option<u64>) -> Result<(), PreviewRejection> {
        let extension = extension_of(filename);
        let allowed = extension
            .as_deref()
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext));
        if !allowed {
            return Err(PreviewRejection::Extension(extension));
        }
        let size = size.ok_or(PreviewRejection::UnknownSize)?;
        if size >= self.ceiling {
            return Err(PreviewRejection::TooLarge {
                size,
                ceiling: self.ceiling,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_eligible(&self, filename: &str, size: Option<u64>) -> bool {
        self.check(filename, size).is_ok()
    }
}

/// Lower-cased extension after the last dot, ignoring dotfiles like `.env`.
fn extension_of(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_lowercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_file_under_ceiling_is_eligible() {
        let policy = PreviewPolicy::default();
        assert!(policy.is_eligible("notes.TXT", Some(1024)));
        assert!(policy.is_eligible("dir/data.json", Some(DEFAULT_PREVIEW_CEILING - 1)));
    }

    #[test]
    fn binary_extension_is_rejected() {
        let policy = PreviewPolicy::default();
        assert_eq!(
            policy.check("photo.png", Some(10)),
            Err(PreviewRejection::Extension(Some("png".into())))
        );
        assert_eq!(
            policy.check("README", Some(10)),
            Err(PreviewRejection::Extension(None))
        );
        assert_eq!(
            policy.check(".env", None),
            Err(PreviewRejection::Extension(None))
        );
    }

    #[test]
    fn ceiling_is_exclusive() {
        let policy = PreviewPolicy::default();
        assert_eq!(
            policy.check("big.log", Some(DEFAULT_PREVIEW_CEILING)),
            Err(PreviewRejection::TooLarge {
                size: DEFAULT_PREVIEW_CEILING,
                ceiling: DEFAULT_PREVIEW_CEILING
            })
        );
    }

    #[test]
    fn unknown_size_is_rejected() {
        let policy = PreviewPolicy::default();
        assert_eq!(
            policy.check("dump.log", None),
            Err(PreviewRejection::UnknownSize)
        );
        assert!(policy.is_eligible("dump.log", Some(0)));
    }

    #[test]
    fn custom_policy() {
        let policy = PreviewPolicy {
            ceiling: 100,
            extensions: vec!["dat".into()],
        };
        assert!(policy.is_eligible("x.dat", Some(99)));
        assert!(!policy.is_eligible("x.txt", Some(1)));
    }
}
