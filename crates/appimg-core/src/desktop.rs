//! Desktop integration: writes a `.desktop` launcher referencing the installed binary, following
//! the freedesktop.org desktop entry spec's minimum viable set of keys.

use std::path::{Path, PathBuf};

use appimg_utils::error::{FileSystemResult, IoOperation, IoResultExt};
use appimg_utils::path::desktop_dir;

/// Renders and writes `<desktop_dir>/<appName>.desktop`, overwriting any existing file.
pub fn write_desktop_entry(
    app_name: &str,
    exec_path: &Path,
    icon_path: Option<&Path>,
    comment: &str,
) -> FileSystemResult<PathBuf> {
    let dir = desktop_dir();
    appimg_utils::fs::ensure_dir_exists(&dir)?;

    let path = dir.join(format!("{app_name}.desktop"));
    let contents = render_desktop_entry(app_name, exec_path, icon_path, comment);

    std::fs::write(&path, contents).with_path(&path, IoOperation::WriteFile)?;
    Ok(path)
}

fn render_desktop_entry(
    app_name: &str,
    exec_path: &Path,
    icon_path: Option<&Path>,
    comment: &str,
) -> String {
    let mut out = String::new();
    out.push_str("[Desktop Entry]\n");
    out.push_str("Type=Application\n");
    out.push_str(&format!("Name={app_name}\n"));
    out.push_str(&format!("Comment={comment}\n"));
    out.push_str(&format!("Exec=\"{}\" %U\n", exec_path.display()));
    if let Some(icon) = icon_path {
        out.push_str(&format!("Icon={}\n", icon.display()));
    }
    out.push_str("Terminal=false\n");
    out.push_str("Categories=Utility;\n");
    out
}
