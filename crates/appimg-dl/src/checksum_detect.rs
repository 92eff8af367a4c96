//! Auto-detection and prioritization of checksum-file assets attached to a release.

use regex::Regex;
use std::sync::LazyLock;

use crate::github::Asset;

/// Format a checksum file is expected to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumFormat {
    /// A YAML manifest (e.g. `latest-linux.yml`) with base64-encoded digests.
    Structured,
    /// A line-oriented `<hash>  <filename>` style file.
    LineOriented,
}

/// A candidate checksum artifact discovered alongside a release's downloadable assets.
#[derive(Debug, Clone)]
pub struct ChecksumFileInfo {
    pub filename: String,
    pub url: String,
    pub format: ChecksumFormat,
}

/// Ordered, case-insensitive patterns matched against release asset names. Order establishes a
/// rough preference among otherwise-equal generic matches, though actual serving order is
/// decided by [`prioritize_checksum_files`].
static CHECKSUM_FILE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)latest-.*\.yml$",
        r"(?i)latest-.*\.yaml$",
        r"(?i).*checksums?\.txt$",
        r"(?i).*checksums?\.yml$",
        r"(?i).*checksums?\.yaml$",
        r"(?i).*checksums?\.md5$",
        r"(?i).*checksums?\.sha1$",
        r"(?i).*checksums?\.sha256$",
        r"(?i).*checksums?\.sha512$",
        r"(?i)sha\d+sums?(\.txt)?$",
        r"(?i)md5sums?(\.txt)?$",
        r"(?i).*\.sum$",
        r"(?i).*\.hash$",
        r"(?i).*\.digest$",
        r"(?i).*appimage\.sha256$",
        r"(?i).*appimage\.sha512$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static checksum pattern is valid"))
    .collect()
});

fn format_for(filename: &str) -> ChecksumFormat {
    let lower = filename.to_lowercase();
    if lower.ends_with(".yml") || lower.ends_with(".yaml") {
        ChecksumFormat::Structured
    } else {
        ChecksumFormat::LineOriented
    }
}

/// Scans `assets` for names matching a known checksum-file pattern, returning structured
/// manifests before line-oriented ones.
pub fn detect_checksum_files(assets: &[Asset]) -> Vec<ChecksumFileInfo> {
    let mut found: Vec<ChecksumFileInfo> = assets
        .iter()
        .filter(|a| CHECKSUM_FILE_PATTERNS.iter().any(|re| re.is_match(&a.name)))
        .map(|a| ChecksumFileInfo {
            filename: a.name.clone(),
            url: a.url.clone(),
            format: format_for(&a.name),
        })
        .collect();

    found.sort_by_key(|f| (f.format != ChecksumFormat::Structured, f.filename.clone()));
    found
}

/// Builds the single explicit checksum file named by a per-app config's `checksumFile` field,
/// resolving `{version}`/`{tag}`/`{asset_name}` placeholders and the download URL.
pub fn resolve_manual_checksum_file(
    template: &str,
    owner: &str,
    repo: &str,
    tag: &str,
    version: &str,
    asset_name: &str,
) -> ChecksumFileInfo {
    let filename = template
        .replace("{version}", version)
        .replace("{tag}", tag)
        .replace("{asset_name}", asset_name);
    let url = format!("https://github.com/{owner}/{repo}/releases/download/{tag}/{filename}");
    let format = format_for(&filename);
    ChecksumFileInfo {
        filename,
        url,
        format,
    }
}

const EXPERIMENTAL_VARIANTS: &[&str] = &["experimental", "beta", "alpha", "preview", "rc", "dev"];

fn priority(info: &ChecksumFileInfo, target_filename: &str) -> (u8, String) {
    let filename = &info.filename;

    if filename == &format!("{target_filename}.DIGEST") || filename == &format!("{target_filename}.digest")
    {
        return (1, filename.clone());
    }

    const PLATFORM_EXTENSIONS: &[&str] = &[
        ".sha256",
        ".sha512",
        ".sha1",
        ".md5",
        ".sha256sum",
        ".sha512sum",
        ".sha1sum",
        ".md5sum",
    ];
    if PLATFORM_EXTENSIONS
        .iter()
        .any(|ext| filename == &format!("{target_filename}{ext}"))
    {
        return (2, filename.clone());
    }

    if info.format == ChecksumFormat::Structured {
        return (3, filename.clone());
    }

    if filename.to_lowercase().ends_with(".digest") {
        return (4, filename.clone());
    }

    let lower = filename.to_lowercase();
    let penalty = if EXPERIMENTAL_VARIANTS.iter().any(|v| lower.contains(v)) {
        10
    } else {
        0
    };
    (5 + penalty, filename.clone())
}

/// Reorders detected checksum files so the one most likely to cover `target_filename` is tried
/// first: an exact `<file>.DIGEST` match, then a platform-specific hash extension, then
/// structured manifests, then other `.DIGEST` files, then generic files (experimental-tagged
/// ones pushed last).
pub fn prioritize_checksum_files(
    mut checksum_files: Vec<ChecksumFileInfo>,
    target_filename: &str,
) -> Vec<ChecksumFileInfo> {
    checksum_files.sort_by_key(|f| priority(f, target_filename));
    checksum_files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            size: 10,
            url: format!("https://example.com/{name}"),
            digest: String::new(),
        }
    }

    #[test]
    fn test_detects_known_patterns() {
        let assets = vec![
            asset("app.AppImage"),
            asset("SHA256SUMS"),
            asset("latest-linux.yml"),
            asset("readme.md"),
        ];
        let detected = detect_checksum_files(&assets);
        let names: Vec<&str> = detected.iter().map(|f| f.filename.as_str()).collect();
        assert!(names.contains(&"SHA256SUMS"));
        assert!(names.contains(&"latest-linux.yml"));
        assert!(!names.contains(&"readme.md"));
        assert!(!names.contains(&"app.AppImage"));
    }

    #[test]
    fn test_structured_sorted_before_line_oriented() {
        let assets = vec![asset("SHA256SUMS"), asset("latest-linux.yml")];
        let detected = detect_checksum_files(&assets);
        assert_eq!(detected[0].filename, "latest-linux.yml");
        assert_eq!(detected[0].format, ChecksumFormat::Structured);
        assert_eq!(detected[1].format, ChecksumFormat::LineOriented);
    }

    #[test]
    fn test_resolve_manual_checksum_file_substitutes_placeholders() {
        let info = resolve_manual_checksum_file(
            "{asset_name}.sha256",
            "owner",
            "repo",
            "v1.0.0",
            "1.0.0",
            "app.AppImage",
        );
        assert_eq!(info.filename, "app.AppImage.sha256");
        assert_eq!(
            info.url,
            "https://github.com/owner/repo/releases/download/v1.0.0/app.AppImage.sha256"
        );
        assert_eq!(info.format, ChecksumFormat::LineOriented);
    }

    #[test]
    fn test_prioritize_exact_digest_first() {
        let files = vec![
            ChecksumFileInfo {
                filename: "checksums.txt".to_string(),
                url: String::new(),
                format: ChecksumFormat::LineOriented,
            },
            ChecksumFileInfo {
                filename: "app.AppImage.DIGEST".to_string(),
                url: String::new(),
                format: ChecksumFormat::LineOriented,
            },
        ];
        let prioritized = prioritize_checksum_files(files, "app.AppImage");
        assert_eq!(prioritized[0].filename, "app.AppImage.DIGEST");
    }

    #[test]
    fn test_prioritize_platform_specific_before_generic() {
        let files = vec![
            ChecksumFileInfo {
                filename: "checksums.txt".to_string(),
                url: String::new(),
                format: ChecksumFormat::LineOriented,
            },
            ChecksumFileInfo {
                filename: "app.AppImage.sha256".to_string(),
                url: String::new(),
                format: ChecksumFormat::LineOriented,
            },
        ];
        let prioritized = prioritize_checksum_files(files, "app.AppImage");
        assert_eq!(prioritized[0].filename, "app.AppImage.sha256");
    }

    #[test]
    fn test_prioritize_pushes_experimental_generic_last() {
        let files = vec![
            ChecksumFileInfo {
                filename: "checksums-beta.txt".to_string(),
                url: String::new(),
                format: ChecksumFormat::LineOriented,
            },
            ChecksumFileInfo {
                filename: "checksums.txt".to_string(),
                url: String::new(),
                format: ChecksumFormat::LineOriented,
            },
        ];
        let prioritized = prioritize_checksum_files(files, "app.AppImage");
        assert_eq!(prioritized[0].filename, "checksums.txt");
        assert_eq!(prioritized[1].filename, "checksums-beta.txt");
    }
}
