//! Parsing of checksum-file content: the line-oriented form (SHA256SUMS-style, generic
//! `<hash> <filename>`, and `<algo>:<hash>` key-value lines) and the structured YAML-ish form
//! used by electron-builder-style manifests (`latest-linux.yml`), whose hashes are base64.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Finds the expected hash for `target_filename` in a line-oriented checksum file.
///
/// Blank lines and `#`-prefixed comments are skipped. Each remaining line is tried, in order,
/// against three shapes: a 64-character-hex-first SHA256SUMS line, an `<algo>:<hash>` key-value
/// line (hash applies to the caller-supplied filename), and a generic `<hash> <filename>` pair.
/// Filenames are compared by their final path component, so `*build/app.AppImage` matches
/// `app.AppImage`.
pub fn parse_line_oriented(content: &str, target_filename: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (hash, filename) = if is_sha256sums_line(line) {
            parse_sha256sums_line(line)
        } else if let Some(idx) = line.find(':') {
            let hash = line[idx + 1..].trim().to_string();
            (hash, target_filename.to_string())
        } else {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(hash), Some(name)) => (hash.to_string(), name.to_string()),
                _ => continue,
            }
        };

        if hash.is_empty() {
            continue;
        }

        if Path::new(&filename).file_name().and_then(|n| n.to_str()) == Some(target_filename) {
            return Some(hash);
        }
    }
    None
}

fn is_sha256sums_line(line: &str) -> bool {
    let mut parts = line.split_whitespace();
    matches!(parts.next(), Some(first) if first.len() == 64 && parts.next().is_some())
}

fn parse_sha256sums_line(line: &str) -> (String, String) {
    let mut parts = line.splitn(2, char::is_whitespace);
    let hash = parts.next().unwrap_or_default().to_string();
    let filename = parts
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('*')
        .to_string();
    (hash, filename)
}

/// Finds the expected hash for `target_filename` in a structured (YAML-style) manifest, and
/// re-encodes its base64 value to lowercase hex.
///
/// Recognizes a `files:` list of `- url: <name>` / `<algo>: <base64>` blocks, and falls back to
/// a top-level `path:` / `sha512:`/`sha256:` pair for single-file manifests.
pub fn parse_structured(content: &str, target_filename: &str) -> Option<String> {
    if let Some(hash) = parse_structured_file_list(content, target_filename) {
        return Some(hash);
    }
    parse_structured_top_level(content, target_filename)
}

fn parse_structured_file_list(content: &str, target_filename: &str) -> Option<String> {
    let mut entry_url: Option<String> = None;
    let mut entry_hash: Option<String> = None;
    let mut in_files_block = false;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();

        if !in_files_block {
            if trimmed == "files:" {
                in_files_block = true;
            }
            continue;
        }

        // A line back at column 0 is a top-level key (`path:`, `sha512:`, ...), which marks the
        // end of the `files:` list; those keys belong to a different (primary-asset) pointer.
        if indent == 0 {
            break;
        }

        if trimmed.starts_with("- ") {
            if entry_url.as_deref() == Some(target_filename) {
                if let Some(hash) = entry_hash {
                    return base64_to_hex(&hash);
                }
            }
            entry_url = None;
            entry_hash = None;
        }

        if let Some(value) = strip_key(trimmed, "url") {
            entry_url = Some(value.to_string());
        } else if let Some(value) = strip_key(trimmed, "sha512") {
            entry_hash = Some(value.to_string());
        } else if let Some(value) = strip_key(trimmed, "sha256") {
            entry_hash = Some(value.to_string());
        }
    }

    if entry_url.as_deref() == Some(target_filename) {
        if let Some(hash) = entry_hash {
            return base64_to_hex(&hash);
        }
    }

    None
}

fn parse_structured_top_level(content: &str, target_filename: &str) -> Option<String> {
    let mut path: Option<String> = None;
    let mut hash: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("- ") {
            continue;
        }
        if let Some(value) = strip_key(trimmed, "path") {
            path = Some(value.to_string());
        } else if let Some(value) = strip_key(trimmed, "sha512") {
            hash = Some(value.to_string());
        } else if let Some(value) = strip_key(trimmed, "sha256") {
            hash = hash.or(Some(value.to_string()));
        }
    }

    if path.as_deref() == Some(target_filename) {
        hash.and_then(|h| base64_to_hex(&h))
    } else {
        None
    }
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let prefix = format!("{key}:");
    let line = line.strip_prefix("- ").unwrap_or(line).trim_start();
    line.strip_prefix(&prefix).map(|v| v.trim().trim_matches('\''))
}

fn base64_to_hex(value: &str) -> Option<String> {
    STANDARD.decode(value).ok().map(hex::encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA256SUMS: &str = "\
# comment
e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855  app.AppImage
deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef  *other.AppImage
";

    #[test]
    fn test_parse_line_oriented_sha256sums() {
        let hash = parse_line_oriented(SHA256SUMS, "app.AppImage").unwrap();
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_parse_line_oriented_strips_star_prefix() {
        let hash = parse_line_oriented(SHA256SUMS, "other.AppImage").unwrap();
        assert_eq!(
            hash,
            "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef"
        );
    }

    #[test]
    fn test_parse_line_oriented_not_found() {
        assert!(parse_line_oriented(SHA256SUMS, "missing.AppImage").is_none());
    }

    #[test]
    fn test_parse_line_oriented_skips_comments_and_blanks() {
        let content = "\n# just a comment\n\nsha256: abc123\n";
        let hash = parse_line_oriented(content, "app.AppImage").unwrap();
        assert_eq!(hash, "abc123");
    }

    const LEGCORD_YAML: &str = "version: 1.1.5
files:
  - url: Legcord-1.1.5-linux-x86_64.AppImage
    sha512: JNmYBTG9lqXt/VXmes32pu3bnz/YaKMzfjFVL+0J+S8MSWl7nLmHolmUNLFAubpy1JWTUwEdlPW8UhRNxNiQuw==
    size: 124457255
  - url: Legcord-1.1.5-linux-x86_64.rpm
    sha512: 3j2/BdKHypZrIQ0qDzJk9WjyXJwCfPfbQ7la8i+YFSHZwzOBdWDrkLPh16ZhTa3zRbQ13/XyeN76HwrRzCJIRg==
    size: 82429221
path: Legcord-1.1.5-linux-x86_64.AppImage
sha512: JNmYBTG9lqXt/VXmes32pu3bnz/YaKMzfjFVL+0J+S8MSWl7nLmHolmUNLFAubpy1JWTUwEdlPW8UhRNxNiQuw==
releaseDate: '2025-05-26T17:26:48.710Z'";

    const EXPECTED_HEX: &str = "24d9980531bd96a5edfd55e67acdf6a6eddb9f3fd868a3337e31552fed09f92f0c49697b9cb987a2599434b140b9ba72d4959353011d94f5bc52144dc4d890bb";

    #[test]
    fn test_parse_structured_file_list_entry() {
        let hash = parse_structured(LEGCORD_YAML, "Legcord-1.1.5-linux-x86_64.AppImage").unwrap();
        assert_eq!(hash, EXPECTED_HEX);
    }

    #[test]
    fn test_parse_structured_other_file_list_entry() {
        let hash = parse_structured(LEGCORD_YAML, "Legcord-1.1.5-linux-x86_64.rpm").unwrap();
        assert_eq!(
            hash,
            hex::encode(
                STANDARD
                    .decode("3j2/BdKHypZrIQ0qDzJk9WjyXJwCfPfbQ7la8i+YFSHZwzOBdWDrkLPh16ZhTa3zRbQ13/XyeN76HwrRzCJIRg==")
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_parse_structured_not_found() {
        assert!(parse_structured(LEGCORD_YAML, "missing-file").is_none());
    }

    #[test]
    fn test_parse_structured_top_level_single_file() {
        let content = "path: app.AppImage\nsha256: JNmYBTG9lqXt/VXmes32pu3bnz/YaKMzfjFVL+0J+S8MSQ==";
        let hash = parse_structured(content, "app.AppImage");
        assert!(hash.is_some());
    }
}
