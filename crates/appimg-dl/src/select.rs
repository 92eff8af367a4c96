//! Deterministic asset selection from a release's asset list.

use crate::github::Asset;

/// Where an install request originated, which changes which selector rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationSource {
    Url,
    Catalog,
}

const UNSTABLE_TAGS: &[&str] = &[
    "experimental",
    "beta",
    "alpha",
    "rc",
    "pre",
    "dev",
    "test",
    "nightly",
];

const ARM_MARKERS: &[&str] = &["arm64", "aarch64", "armhf", "armv7", "armv6"];

/// Picks the best AppImage asset for the platform, per the precedence rules in §4.3: filter to
/// `.AppImage`/`.appimage` names, drop unstable-tagged assets for URL installs, prefer the
/// catalog's configured suffixes, drop ARM builds, then prefer an explicit x86_64/amd64 build.
pub fn select_appimage<'a>(
    assets: &'a [Asset],
    preferred_suffixes: &[String],
    source: InstallationSource,
) -> Option<&'a Asset> {
    let mut candidates: Vec<&Asset> = assets
        .iter()
        .filter(|a| {
            let lower = a.name.to_lowercase();
            lower.ends_with(".appimage")
        })
        .collect();

    if candidates.is_empty() {
        return None;
    }

    if source == InstallationSource::Url {
        let filtered: Vec<&Asset> = candidates
            .iter()
            .copied()
            .filter(|a| {
                let lower = a.name.to_lowercase();
                !UNSTABLE_TAGS.iter().any(|tag| lower.contains(tag))
            })
            .collect();
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }

    if source == InstallationSource::Catalog && !preferred_suffixes.is_empty() {
        let suffixes: Vec<String> = preferred_suffixes.iter().map(|s| s.to_lowercase()).collect();
        let filtered: Vec<&Asset> = candidates
            .iter()
            .copied()
            .filter(|a| {
                let lower = a.name.to_lowercase();
                suffixes.iter().any(|suffix| lower.contains(suffix.as_str()))
            })
            .collect();
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }

    let filtered: Vec<&Asset> = candidates
        .iter()
        .copied()
        .filter(|a| {
            let lower = a.name.to_lowercase();
            !ARM_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .collect();
    if !filtered.is_empty() {
        candidates = filtered;
    }

    if source == InstallationSource::Catalog {
        if let Some(amd64) = candidates.iter().find(|a| {
            let lower = a.name.to_lowercase();
            lower.contains("x86_64") || lower.contains("amd64")
        }) {
            return Some(amd64);
        }
    }

    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            size: 100,
            url: format!("https://example.com/{name}"),
            digest: String::new(),
        }
    }

    #[test]
    fn test_filters_to_appimage_suffix() {
        let assets = vec![asset("app.tar.gz"), asset("app-x86_64.AppImage")];
        let selected = select_appimage(&assets, &[], InstallationSource::Catalog).unwrap();
        assert_eq!(selected.name, "app-x86_64.AppImage");
    }

    #[test]
    fn test_no_appimage_returns_none() {
        let assets = vec![asset("app.tar.gz"), asset("app.zip")];
        assert!(select_appimage(&assets, &[], InstallationSource::Catalog).is_none());
    }

    #[test]
    fn test_url_source_drops_unstable_tags() {
        let assets = vec![
            asset("app-beta-x86_64.AppImage"),
            asset("app-x86_64.AppImage"),
        ];
        let selected = select_appimage(&assets, &[], InstallationSource::Url).unwrap();
        assert_eq!(selected.name, "app-x86_64.AppImage");
    }

    #[test]
    fn test_url_source_falls_back_when_all_unstable() {
        let assets = vec![asset("app-beta-x86_64.AppImage")];
        let selected = select_appimage(&assets, &[], InstallationSource::Url).unwrap();
        assert_eq!(selected.name, "app-beta-x86_64.AppImage");
    }

    #[test]
    fn test_catalog_preferred_suffix_filters() {
        let assets = vec![
            asset("app-x86_64.AppImage"),
            asset("app-gtk-x86_64.AppImage"),
        ];
        let suffixes = vec!["gtk".to_string()];
        let selected = select_appimage(&assets, &suffixes, InstallationSource::Catalog).unwrap();
        assert_eq!(selected.name, "app-gtk-x86_64.AppImage");
    }

    #[test]
    fn test_catalog_preferred_suffix_falls_back_when_empty() {
        let assets = vec![asset("app-x86_64.AppImage")];
        let suffixes = vec!["qt".to_string()];
        let selected = select_appimage(&assets, &suffixes, InstallationSource::Catalog).unwrap();
        assert_eq!(selected.name, "app-x86_64.AppImage");
    }

    #[test]
    fn test_drops_arm_builds() {
        let assets = vec![
            asset("app-aarch64.AppImage"),
            asset("app-x86_64.AppImage"),
        ];
        let selected = select_appimage(&assets, &[], InstallationSource::Catalog).unwrap();
        assert_eq!(selected.name, "app-x86_64.AppImage");
    }

    #[test]
    fn test_arm_fallback_when_only_arm_present() {
        let assets = vec![asset("app-aarch64.AppImage")];
        let selected = select_appimage(&assets, &[], InstallationSource::Catalog).unwrap();
        assert_eq!(selected.name, "app-aarch64.AppImage");
    }

    #[test]
    fn test_catalog_prefers_explicit_amd64_marker() {
        let assets = vec![asset("app-generic.AppImage"), asset("app-amd64.AppImage")];
        let selected = select_appimage(&assets, &[], InstallationSource::Catalog).unwrap();
        assert_eq!(selected.name, "app-amd64.AppImage");
    }

    #[test]
    fn test_url_source_ignores_amd64_preference_uses_first() {
        let assets = vec![asset("app-generic.AppImage"), asset("app-amd64.AppImage")];
        let selected = select_appimage(&assets, &[], InstallationSource::Url).unwrap();
        assert_eq!(selected.name, "app-generic.AppImage");
    }

    #[test]
    fn test_case_insensitive_matching() {
        let assets = vec![asset("App-BETA-X86_64.APPIMAGE")];
        let selected = select_appimage(&assets, &[], InstallationSource::Url).unwrap();
        assert_eq!(selected.name, "App-BETA-X86_64.APPIMAGE");
    }
}
