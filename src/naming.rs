//! Output artifact naming.
//!
//! Every download is the original filename's stem plus a fixed suffix telling
//! the user which pipeline produced it: `_processed` for the plain normalized
//! frame, `_text_overlay` when the caption was composited in. The container
//! is always PNG.

/// Suffix for the plain normalized frame.
pub const PROCESSED_SUFFIX: &str = "_processed";
/// Suffix for the frame with the caption overlay.
pub const OVERLAY_SUFFIX: &str = "_text_overlay";

const OUTPUT_EXTENSION: &str = "png";

/// Build the download filename for an item.
///
/// The stem is everything before the last `.` of the original name (or the
/// whole name when it has no extension). Path separators are flattened so a
/// name can never escape the output directory.
///
/// - `"dawn.jpg"`, plain → `"dawn_processed.png"`
/// - `"dawn.jpg"`, overlaid → `"dawn_text_overlay.png"`
/// - `"archive.tar.gz"` → `"archive.tar_processed.png"`
/// - `"noext"` → `"noext_processed.png"`
pub fn download_name(original: &str, overlaid: bool) -> String {
    let stem = match original.rfind('.') {
        Some(0) | None => original,
        Some(dot) => &original[..dot],
    };
    let safe_stem: String = stem
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { '_' } else { ch })
        .collect();
    let suffix = if overlaid {
        OVERLAY_SUFFIX
    } else {
        PROCESSED_SUFFIX
    };
    format!("{safe_stem}{suffix}.{OUTPUT_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_gets_processed_suffix() {
        assert_eq!(download_name("dawn.jpg", false), "dawn_processed.png");
    }

    #[test]
    fn overlaid_output_gets_text_overlay_suffix() {
        assert_eq!(download_name("dawn.jpg", true), "dawn_text_overlay.png");
    }

    #[test]
    fn only_last_extension_is_stripped() {
        assert_eq!(
            download_name("archive.tar.gz", false),
            "archive.tar_processed.png"
        );
    }

    #[test]
    fn name_without_extension_is_kept_whole() {
        assert_eq!(download_name("noext", false), "noext_processed.png");
    }

    #[test]
    fn leading_dot_name_is_kept_whole() {
        assert_eq!(download_name(".hidden", false), ".hidden_processed.png");
    }

    #[test]
    fn path_separators_are_flattened() {
        assert_eq!(
            download_name("trip/day one.jpg", true),
            "trip_day one_text_overlay.png"
        );
        assert_eq!(
            download_name("trip\\two.png", false),
            "trip_two_processed.png"
        );
    }
}
