//! GitHub release resolution: fetches `Release`/`Asset` snapshots, tracks rate limits, and
//! optionally short-circuits network calls through a small release cache.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, AtomicU32, Ordering},
        Mutex,
    },
};

use serde::Deserialize;

use crate::{error::DownloadError, http_client::SHARED_AGENT};

/// A downloadable file attached to a release.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub size: u64,
    pub url: String,
    /// `<algorithm>:<hex>`, empty when GitHub reported none.
    pub digest: String,
}

/// A named version of a repository, resolved from the GitHub releases API.
#[derive(Debug, Clone)]
pub struct Release {
    pub owner: String,
    pub repo: String,
    /// Tag with any leading `v` and `pkg@ver` prefix stripped.
    pub version: String,
    /// The unmodified tag, needed to build `releases/download/<tag>/...` URLs.
    pub original_tag_name: String,
    pub prerelease: bool,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    tag_name: String,
    prerelease: bool,
    #[serde(default)]
    assets: Vec<RawAsset>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    name: Option<String>,
    size: u64,
    browser_download_url: Option<String>,
    #[serde(default)]
    digest: Option<String>,
}

/// Normalizes a release tag into a bare version: strips a leading `v` and any `pkg@` prefix.
///
/// # Examples
///
/// ```
/// use appimg_dl::github::normalize_version;
///
/// assert_eq!(normalize_version("v1.2.3"), "1.2.3");
/// assert_eq!(normalize_version("myapp@2.0.0"), "2.0.0");
/// assert_eq!(normalize_version("2024.01.01"), "2024.01.01");
/// ```
pub fn normalize_version(tag: &str) -> String {
    let tag = tag.rsplit_once('@').map(|(_, v)| v).unwrap_or(tag);
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}

/// Tracks the most recent GitHub API rate-limit headers across all resolvers in this process.
#[derive(Default)]
pub struct RateLimitTracker {
    remaining: AtomicU32,
    reset_at: AtomicI64,
}

impl RateLimitTracker {
    pub fn update(&self, remaining: u32, reset_at: i64) {
        self.remaining.store(remaining, Ordering::Relaxed);
        self.reset_at.store(reset_at, Ordering::Relaxed);
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Relaxed)
    }

    pub fn reset_at(&self) -> i64 {
        self.reset_at.load(Ordering::Relaxed)
    }
}

/// What a cached release represents: GitHub only exposes "latest" and a distinct prerelease
/// lookup path, so the cache is keyed on that distinction rather than a specific tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseKind {
    Latest,
    Prerelease,
}

type CacheKey = (String, String, &'static str);

/// A small shared key/value cache of resolved releases, keyed by `(owner, repo, kind)`.
#[derive(Default)]
pub struct ReleaseCache {
    entries: Mutex<HashMap<CacheKey, Release>>,
}

impl ReleaseCache {
    fn key(owner: &str, repo: &str, kind: ReleaseKind) -> CacheKey {
        let kind = match kind {
            ReleaseKind::Latest => "latest",
            ReleaseKind::Prerelease => "prerelease",
        };
        (owner.to_string(), repo.to_string(), kind)
    }

    fn get(&self, owner: &str, repo: &str, kind: ReleaseKind) -> Option<Release> {
        self.entries
            .lock()
            .unwrap()
            .get(&Self::key(owner, repo, kind))
            .cloned()
    }

    fn insert(&self, owner: &str, repo: &str, kind: ReleaseKind, release: Release) {
        self.entries
            .lock()
            .unwrap()
            .insert(Self::key(owner, repo, kind), release);
    }
}

/// Resolves releases for a single GitHub repository.
pub struct GithubResolver<'a> {
    pub token: Option<String>,
    pub cache: Option<&'a ReleaseCache>,
    pub rate_limit: Option<&'a RateLimitTracker>,
}

impl<'a> GithubResolver<'a> {
    pub fn new() -> Self {
        Self {
            token: std::env::var("GITHUB_TOKEN").ok(),
            cache: None,
            rate_limit: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a ReleaseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_rate_limit(mut self, tracker: &'a RateLimitTracker) -> Self {
        self.rate_limit = Some(tracker);
        self
    }

    /// Fetches the latest non-prerelease release, honoring the cache unless `ignore_cache`.
    pub fn fetch_latest_release(
        &self,
        owner: &str,
        repo: &str,
        ignore_cache: bool,
    ) -> Result<Release, DownloadError> {
        self.fetch_by_kind(owner, repo, ReleaseKind::Latest, ignore_cache, |o, r| {
            format!("https://api.github.com/repos/{o}/{r}/releases/latest")
        })
    }

    /// Fetches a specific tagged release. Never cached — tags are exact and cheap to refetch.
    pub fn fetch_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Release, DownloadError> {
        let url = format!("https://api.github.com/repos/{owner}/{repo}/releases/tags/{tag}");
        self.fetch_release(owner, repo, &url)
    }

    /// Fetches the newest prerelease by scanning the releases list for `prerelease == true`.
    pub fn fetch_latest_prerelease(
        &self,
        owner: &str,
        repo: &str,
        ignore_cache: bool,
    ) -> Result<Release, DownloadError> {
        self.fetch_by_kind(owner, repo, ReleaseKind::Prerelease, ignore_cache, |o, r| {
            format!("https://api.github.com/repos/{o}/{r}/releases?per_page=20")
        })
    }

    /// Resolves a release honoring a stable/prerelease preference, falling back to the other
    /// kind on any error.
    pub fn fetch_preferred(
        &self,
        owner: &str,
        repo: &str,
        prefer_prerelease: bool,
        ignore_cache: bool,
    ) -> Result<Release, DownloadError> {
        let (first, second): (
            fn(&Self, &str, &str, bool) -> Result<Release, DownloadError>,
            fn(&Self, &str, &str, bool) -> Result<Release, DownloadError>,
        ) = if prefer_prerelease {
            (Self::fetch_latest_prerelease, Self::fetch_latest_release)
        } else {
            (Self::fetch_latest_release, Self::fetch_latest_prerelease)
        };

        match first(self, owner, repo, ignore_cache) {
            Ok(release) => Ok(release),
            Err(_) => second(self, owner, repo, ignore_cache),
        }
    }

    fn fetch_by_kind(
        &self,
        owner: &str,
        repo: &str,
        kind: ReleaseKind,
        ignore_cache: bool,
        url_for: impl Fn(&str, &str) -> String,
    ) -> Result<Release, DownloadError> {
        if !ignore_cache {
            if let Some(cache) = self.cache {
                if let Some(release) = cache.get(owner, repo, kind) {
                    return Ok(release);
                }
            }
        }

        let url = url_for(owner, repo);
        let release = if kind == ReleaseKind::Prerelease {
            self.fetch_first_prerelease(owner, repo, &url)?
        } else {
            self.fetch_release(owner, repo, &url)?
        };

        if let Some(cache) = self.cache {
            cache.insert(owner, repo, kind, release.clone());
        }

        Ok(release)
    }

    fn fetch_release(&self, owner: &str, repo: &str, url: &str) -> Result<Release, DownloadError> {
        let raw: RawRelease = self.get_json(url)?;
        Ok(to_release(owner, repo, raw))
    }

    fn fetch_first_prerelease(
        &self,
        owner: &str,
        repo: &str,
        url: &str,
    ) -> Result<Release, DownloadError> {
        let raw: Vec<RawRelease> = self.get_json(url)?;
        let raw = raw
            .into_iter()
            .find(|r| r.prerelease)
            .ok_or_else(|| DownloadError::ReleaseNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                tag: "prerelease".to_string(),
            })?;
        Ok(to_release(owner, repo, raw))
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, DownloadError> {
        let mut req = SHARED_AGENT.get(url);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {token}"));
        }

        let mut resp = req.call()?;

        if let Some(tracker) = self.rate_limit {
            let remaining = header_u32(&resp, "x-ratelimit-remaining").unwrap_or(0);
            let reset_at = header_i64(&resp, "x-ratelimit-reset").unwrap_or(0);
            tracker.update(remaining, reset_at);
        }

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(DownloadError::HttpError {
                status,
                url: url.to_string(),
            });
        }

        resp.body_mut().read_json::<T>().map_err(DownloadError::Io)
    }
}

impl<'a> Default for GithubResolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

fn header_u32(resp: &ureq::http::Response<ureq::Body>, name: &str) -> Option<u32> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn header_i64(resp: &ureq::http::Response<ureq::Body>, name: &str) -> Option<i64> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn to_release(owner: &str, repo: &str, raw: RawRelease) -> Release {
    let assets = raw
        .assets
        .into_iter()
        .filter_map(|a| {
            let name = a.name?;
            let url = a.browser_download_url?;
            Some(Asset {
                name,
                size: a.size,
                url,
                digest: a.digest.unwrap_or_default(),
            })
        })
        .collect();

    Release {
        owner: owner.to_string(),
        repo: repo.to_string(),
        version: normalize_version(&raw.tag_name),
        original_tag_name: raw.tag_name,
        prerelease: raw.prerelease,
        assets,
    }
}
