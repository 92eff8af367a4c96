use std::{env, path::PathBuf};

use crate::{
    error::{PathError, PathResult},
    system::get_username,
};

/// Resolves a path string that may contain environment variables.
///
/// This method expands environment variables in the format `$VAR` or `${VAR}`, resolves tilde
/// (`~`) to the user's home directory when it appears at the start of the path, and converts
/// relative paths to absolute paths based on the current working directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is empty
/// * [`PathError::FailedToGetCurrentDir`] if the current directory cannot be determined
/// * [`PathError::MissingEnvVar`] if the environment variables are undefined
///
/// # Example
///
/// ```
/// use appimg_utils::error::PathResult;
/// use appimg_utils::path::resolve_path;
///
/// fn main() -> PathResult<()> {
///     let resolved = resolve_path("$HOME/path/to/file")?;
///     println!("Resolved path is {:#?}", resolved);
///     Ok(())
/// }
/// ```
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();

    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let resolved = expand_variables(path)?;
    let path_buf = PathBuf::from(resolved);

    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path_buf))
            .map_err(|err| PathError::FailedToGetCurrentDir { source: err })
    }
}

/// Returns the user's home directory.
///
/// Checks the `HOME` environment variable first, falling back to `/home/{username}`.
pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(format!("/home/{}", get_username())))
}

/// Returns the user's config directory, following the XDG Base Directory Specification.
///
/// Checks `XDG_CONFIG_HOME`; defaults to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns the user's data directory, following the XDG Base Directory Specification.
///
/// Checks `XDG_DATA_HOME`; defaults to `$HOME/.local/share`.
pub fn xdg_data_home() -> PathBuf {
    env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns the user's cache directory, following the XDG Base Directory Specification.
///
/// Checks `XDG_CACHE_HOME`; defaults to `$HOME/.cache`.
pub fn xdg_cache_home() -> PathBuf {
    env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".cache"))
}

/// Returns the default config file path, honoring the `APPIMG_CONFIG` override.
pub fn default_config_path() -> PathBuf {
    env::var("APPIMG_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| xdg_config_home().join("appimg").join("config.toml"))
}

/// Returns the directory `.desktop` entries are installed into.
pub fn desktop_dir() -> PathBuf {
    xdg_data_home().join("applications")
}

/// Returns the base directory icons are installed under, following the hicolor icon theme.
pub fn icons_dir() -> PathBuf {
    xdg_data_home().join("icons/hicolor")
}

/// Returns the directory installed AppImages and their metadata live under.
pub fn install_dir() -> PathBuf {
    xdg_data_home().join("appimg").join("apps")
}

fn expand_variables(path: &str) -> PathResult<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let var_name = consume_until(&mut chars, '}')?;
                    expand_env_var(&var_name, &mut result, path)?;
                } else {
                    let var_name = consume_var_name(&mut chars);
                    if var_name.is_empty() {
                        result.push('$');
                    } else {
                        expand_env_var(&var_name, &mut result, path)?;
                    }
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn consume_until(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    delimiter: char,
) -> PathResult<String> {
    let mut var_name = String::new();

    for c in chars.by_ref() {
        if c == delimiter {
            return Ok(var_name);
        }
        var_name.push(c);
    }

    Err(PathError::UnclosedVariable {
        input: format!("${{{var_name}"),
    })
}

fn consume_var_name(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut var_name = String::new();

    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            var_name.push(chars.next().unwrap());
        } else {
            break;
        }
    }

    var_name
}

fn expand_env_var(var_name: &str, result: &mut String, original: &str) -> PathResult<()> {
    match var_name {
        "HOME" => result.push_str(&home_dir().to_string_lossy()),
        "XDG_CONFIG_HOME" => result.push_str(&xdg_config_home().to_string_lossy()),
        "XDG_DATA_HOME" => result.push_str(&xdg_data_home().to_string_lossy()),
        "XDG_CACHE_HOME" => result.push_str(&xdg_cache_home().to_string_lossy()),
        _ => {
            let value = env::var(var_name).map_err(|_| PathError::MissingEnvVar {
                input: original.into(),
                var: var_name.into(),
            })?;
            result.push_str(&value);
        }
    }
    Ok(())
}
