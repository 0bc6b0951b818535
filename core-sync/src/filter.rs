//! Attachment filtering by MIME type and extension allow-lists.

use bridge_traits::table::Attachment;
use core_runtime::config::FilterSpec;

/// Lower-cased substring after the last `.` of `filename`; `""` without a dot.
pub fn extension_of(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) => filename[idx + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Whether an already-normalized extension passes the extension allow-list.
pub fn extension_allowed(extension: &str, spec: &FilterSpec) -> bool {
    spec.allowed_extensions.is_empty() || spec.allowed_extensions.contains(extension)
}

/// Whether a MIME type passes the MIME allow-list (exact match).
pub fn mime_allowed(mime_type: &str, spec: &FilterSpec) -> bool {
    spec.allowed_mime_types.is_empty() || spec.allowed_mime_types.contains(mime_type)
}

/// An attachment passes when both allow-lists accept it.
pub fn accepts(attachment: &Attachment, spec: &FilterSpec) -> bool {
    mime_allowed(&attachment.mime_type, spec) && extension_allowed(&attachment.extension(), spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(filename: &str, mime_type: &str) -> Attachment {
        Attachment {
            id: None,
            url: format!("https://dl.example/{}", filename),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: None,
        }
    }

    #[test]
    fn test_empty_spec_accepts_everything() {
        let spec = FilterSpec::accept_all();
        assert!(accepts(&attachment("a.png", "image/png"), &spec));
        assert!(accepts(&attachment("README", ""), &spec));
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let spec = FilterSpec::with_extensions([".PDF"]);
        assert!(accepts(&attachment("report.PDF", "application/pdf"), &spec));
        assert!(accepts(&attachment("report.pdf", "application/pdf"), &spec));
        assert!(!accepts(&attachment("report.docx", "application/pdf"), &spec));
    }

    #[test]
    fn test_no_extension_needs_empty_entry() {
        let strict = FilterSpec::with_extensions(["pdf"]);
        assert!(!accepts(&attachment("LICENSE", "text/plain"), &strict));

        let lenient = FilterSpec::with_extensions(["pdf", ""]);
        assert!(accepts(&attachment("LICENSE", "text/plain"), &lenient));
    }

    #[test]
    fn test_both_lists_must_pass() {
        let spec = FilterSpec::new(["image/png"], ["png"]);
        assert!(accepts(&attachment("a.png", "image/png"), &spec));
        assert!(!accepts(&attachment("a.png", "image/jpeg"), &spec));
        assert!(!accepts(&attachment("a.jpg", "image/png"), &spec));

        let mime_only = FilterSpec::new(["application/pdf"], Vec::<String>::new());
        assert!(accepts(&attachment("scan.bin", "application/pdf"), &mime_only));
        assert!(!accepts(&attachment("scan.pdf", "Application/PDF"), &mime_only));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.tar.GZ"), "gz");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".bashrc"), "bashrc");
    }
}
