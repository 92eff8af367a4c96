//! Icon acquisition: extract an icon out of an AppImage's embedded squashfs via its own
//! `--appimage-extract` mode, falling back to a direct download when extraction is unavailable
//! or turns up nothing usable.

use std::path::{Path, PathBuf};

use appimg_events::IconSource;
use tokio::process::Command;

const MIN_ICON_SIZE_BYTES: u64 = 20;

fn format_score(ext: &str) -> i32 {
    match ext.to_ascii_lowercase().as_str() {
        "svg" => 100,
        "png" => 50,
        "ico" => 30,
        "xpm" => 20,
        "bmp" => 10,
        _ => 0,
    }
}

fn name_relevance_bonus(stem: &str, app_name: &str) -> i32 {
    let stem = stem.to_ascii_lowercase();
    let app_name = app_name.to_ascii_lowercase();

    if stem == app_name {
        50
    } else if stem.starts_with(&app_name) {
        30
    } else if stem.contains(&app_name) {
        20
    } else if stem == "icon" || stem == "app" {
        10
    } else {
        0
    }
}

/// stderr substrings that indicate the AppImage's own runtime rejected extraction rather than
/// extraction failing for an environmental reason (disk full, missing binary, etc).
fn is_unrecoverable_format_error(stderr: &str) -> bool {
    const MARKERS: [&str; 3] = [
        "Unsupported AppImage compression format",
        "Cannot open AppImage squashfs filesystem",
        "Invalid AppImage format",
    ];
    MARKERS.iter().any(|m| stderr.contains(m))
}

#[derive(Debug, Clone)]
pub struct ExtractedIcon {
    pub path: PathBuf,
    pub source: IconSource,
}

/// Runs `<appimage> --appimage-extract` in a scratch directory and returns the best-scoring
/// icon found under the extracted tree, if any.
pub async fn extract_icon(appimage_path: &Path, app_name: &str) -> Option<ExtractedIcon> {
    let scratch = tempfile::tempdir().ok()?;

    let output = Command::new(appimage_path)
        .arg("--appimage-extract")
        .current_dir(scratch.path())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_unrecoverable_format_error(&stderr) {
            return None;
        }
        return None;
    }

    let root = scratch.path().join("squashfs-root");
    if !root.is_dir() {
        return None;
    }

    let candidate_dirs = [
        root.clone(),
        root.join("usr/share/icons"),
        root.join("usr/share/pixmaps"),
    ];

    let mut best: Option<(i32, PathBuf)> = None;

    for dir in candidate_dirs {
        if dir.is_dir() {
            scan_dir_for_icons(&dir, app_name, &mut best);
        }
    }

    scan_opt_icons_glob(&root, app_name, &mut best);

    let (_, path) = best?;
    let resolved = resolve_symlink_under(&root, &path).unwrap_or(path);

    Some(ExtractedIcon {
        path: resolved,
        source: IconSource::Extraction,
    })
}

fn scan_dir_for_icons(dir: &Path, app_name: &str, best: &mut Option<(i32, PathBuf)>) {
    let _ = appimg_utils::fs::walk_dir(dir, &mut |path: &Path| -> appimg_utils::error::FileSystemResult<()> {
        consider_icon_candidate(path, app_name, best);
        Ok(())
    });
}

fn scan_opt_icons_glob(root: &Path, app_name: &str, best: &mut Option<(i32, PathBuf)>) {
    let opt_dir = root.join("opt");
    if !opt_dir.is_dir() {
        return;
    }

    let pattern = format!("{}/opt/**/icons", root.display());
    let _ = appimg_utils::fs::walk_dir(&opt_dir, &mut |path: &Path| -> appimg_utils::error::FileSystemResult<()> {
        if let Some(parent) = path.parent() {
            if fast_glob::glob_match(&pattern, &parent.display().to_string()) {
                consider_icon_candidate(path, app_name, best);
            }
        }
        Ok(())
    });
}

fn consider_icon_candidate(path: &Path, app_name: &str, best: &mut Option<(i32, PathBuf)>) {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return;
    };
    let format = format_score(ext);
    if format == 0 {
        return;
    }

    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size < MIN_ICON_SIZE_BYTES {
        return;
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let score = format + name_relevance_bonus(stem, app_name);

    if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
        *best = Some((score, path.to_path_buf()));
    }
}

/// Downloads an icon directly from a URL (a catalog entry's `icon_url`, or a repository's
/// social-preview image) when extraction found nothing usable. Runs the blocking download on a
/// dedicated thread since `appimg_dl::Download` is synchronous.
pub async fn download_icon(url: &str, destination: &Path) -> Option<ExtractedIcon> {
    let url = url.to_string();
    let destination = destination.to_path_buf();

    let result = tokio::task::spawn_blocking(move || {
        appimg_dl::Download::new(url, destination)
            .task_name("icon")
            .execute()
    })
    .await
    .ok()?;

    result.ok().map(|path| ExtractedIcon {
        path,
        source: IconSource::Github,
    })
}

/// Follows a symlink chain rooted anywhere under `root`, returning the final real path.
fn resolve_symlink_under(root: &Path, path: &Path) -> Option<PathBuf> {
    let mut current = path.to_path_buf();
    for _ in 0..16 {
        let metadata = std::fs::symlink_metadata(&current).ok()?;
        if !metadata.file_type().is_symlink() {
            return Some(current);
        }
        let target = std::fs::read_link(&current).ok()?;
        current = if target.is_absolute() {
            target
        } else {
            current.parent()?.join(target)
        };
        if !current.starts_with(root) {
            return None;
        }
    }
    None
}
