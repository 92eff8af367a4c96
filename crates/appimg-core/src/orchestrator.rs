//! Install orchestrator: classifies targets, enforces idempotence and per-path exclusivity, and
//! drives the seven-stage pipeline for each target under a bounded semaphore, fanning out across
//! however many targets were requested in one call.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use appimg_dl::github::{Asset, Release};
use appimg_dl::select::{select_appimage, InstallationSource};
use appimg_dl::types::Progress as DlProgress;
use appimg_events::{IconStage, InstallStage, InstallerEvent, VerifyStage};
use appimg_utils::lock::InstallLock;
use tokio::sync::Semaphore;

use crate::collaborators::{CatalogEntry, CatalogProvider, GlobalConfigProvider};
use crate::config_store;
use crate::context::InstallerContext;
use crate::desktop;
use crate::error::{InstallerError, InstallerResult};
use crate::file_ops;
use crate::icon;
use crate::types::{
    AppConfigRecord, IconPolicy, IconRecord, InstallSource, PerTargetOutcome, StateRecord, Target,
    UrlOverrides, VerificationPolicy, CONFIG_VERSION,
};

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(500);
const LOCK_RETRY_ATTEMPTS: u32 = 10;

/// Per-target resolved policy, whether it came from a catalog entry or URL defaults.
struct TargetPlan {
    app_name: String,
    owner: String,
    repo: String,
    tag: Option<String>,
    prerelease: bool,
    preferred_suffixes: Vec<String>,
    naming_template: Option<String>,
    verification: VerificationPolicy,
    icon: IconPolicy,
    install_source: InstallSource,
    catalog_ref: Option<String>,
}

/// Splits `owner/repo[@tag]` out of a `https://github.com/...` URL target.
fn parse_github_url(url: &str) -> Option<(String, String, Option<String>)> {
    let rest = url.strip_prefix("https://github.com/")?;
    let rest = rest.trim_end_matches('/');
    let mut parts = rest.splitn(2, '/');
    let owner = parts.next()?.to_string();
    let repo_and_tag = parts.next()?;
    if owner.is_empty() || repo_and_tag.is_empty() {
        return None;
    }
    match repo_and_tag.split_once('@') {
        Some((repo, tag)) => Some((owner, repo.to_string(), Some(tag.to_string()))),
        None => Some((owner, repo_and_tag.to_string(), None)),
    }
}

fn classify(raw: &str, catalog: &dyn CatalogProvider) -> Result<Target, String> {
    if raw.starts_with("https://github.com/") {
        if parse_github_url(raw).is_some() {
            Ok(Target::Url(raw.to_string()))
        } else {
            Err(raw.to_string())
        }
    } else if catalog.app_config(raw).is_some() {
        Ok(Target::Catalog(raw.to_string()))
    } else {
        Err(raw.to_string())
    }
}

fn plan_for_target(target: &Target, catalog: &dyn CatalogProvider) -> TargetPlan {
    match target {
        Target::Url(url) => {
            let (owner, repo, tag) = parse_github_url(url).expect("validated during classification");
            TargetPlan {
                app_name: repo.clone(),
                owner,
                repo,
                tag,
                prerelease: false,
                preferred_suffixes: Vec::new(),
                naming_template: None,
                verification: VerificationPolicy::default(),
                icon: IconPolicy::default(),
                install_source: InstallSource::Url,
                catalog_ref: None,
            }
        }
        Target::Catalog(name) => {
            let entry: CatalogEntry = catalog
                .app_config(name)
                .expect("validated during classification");
            TargetPlan {
                app_name: name.clone(),
                owner: entry.owner,
                repo: entry.repo,
                tag: None,
                prerelease: entry.prerelease,
                preferred_suffixes: entry.preferred_suffixes,
                naming_template: entry.naming_template,
                verification: entry.verification,
                icon: entry.icon,
                install_source: InstallSource::Catalog,
                catalog_ref: Some(name.to_lowercase()),
            }
        }
    }
}

/// Runs the full pipeline for every target, bounded by `ctx.options().concurrency`, and returns
/// one outcome per target in input order.
pub async fn install(
    targets: &[String],
    ctx: Arc<InstallerContext>,
    catalog: Arc<dyn CatalogProvider>,
    global: Arc<dyn GlobalConfigProvider>,
) -> InstallerResult<Vec<PerTargetOutcome>> {
    let mut unknown = Vec::new();
    let mut classified = Vec::with_capacity(targets.len());
    for raw in targets {
        match classify(raw, catalog.as_ref()) {
            Ok(t) => classified.push(t),
            Err(bad) => unknown.push(bad),
        }
    }
    if !unknown.is_empty() {
        return Err(InstallerError::Validation(unknown.join(", ")));
    }

    let completed = Arc::new(AtomicU32::new(0));
    let failed = Arc::new(AtomicU32::new(0));
    let total = classified.len() as u32;

    let mut handles = Vec::with_capacity(classified.len());
    for (index, target) in classified.into_iter().enumerate() {
        let ctx = ctx.clone();
        let catalog = catalog.clone();
        let global = global.clone();
        let completed = completed.clone();
        let failed = failed.clone();

        handles.push(tokio::spawn(async move {
            let semaphore: Arc<Semaphore> = ctx.semaphore();
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");

            let op_id = index as u64;
            let outcome = run_pipeline(op_id, &target, ctx.clone(), catalog.as_ref(), global.as_ref()).await;

            let failed_count = if outcome.is_success() {
                failed.load(Ordering::Relaxed)
            } else {
                failed.fetch_add(1, Ordering::Relaxed) + 1
            };
            let completed_count = completed.fetch_add(1, Ordering::Relaxed) + 1;
            ctx.events().emit(InstallerEvent::BatchProgress {
                completed: completed_count,
                total,
                failed: failed_count,
            });

            (index, outcome)
        }));
    }

    let mut results: Vec<Option<PerTargetOutcome>> = (0..handles.len()).map(|_| None).collect();
    for handle in handles {
        let (index, outcome) = handle.await.map_err(|e| InstallerError::Internal(e.to_string()))?;
        results[index] = Some(outcome);
    }

    Ok(results.into_iter().map(|o| o.expect("every index populated")).collect())
}

async fn run_pipeline(
    op_id: u64,
    target: &Target,
    ctx: Arc<InstallerContext>,
    catalog: &dyn CatalogProvider,
    global: &dyn GlobalConfigProvider,
) -> PerTargetOutcome {
    let raw = target.raw().to_string();
    let plan = plan_for_target(target, catalog);
    let install_path = file_ops::canonical_install_path(&global.install_dir(), &plan.app_name);

    if !ctx.options().force && install_path.exists() {
        ctx.events().emit(InstallerEvent::AlreadyInstalled {
            op_id,
            target: raw.clone(),
        });
        return PerTargetOutcome::AlreadyInstalled { target: raw };
    }

    let lock = match acquire_lock_with_retry(&install_path, ctx.clone()).await {
        Ok(lock) => lock,
        Err(e) => return failure_outcome(raw, e),
    };

    if !ctx.options().force && install_path.exists() {
        drop(lock);
        ctx.events().emit(InstallerEvent::AlreadyInstalled {
            op_id,
            target: raw.clone(),
        });
        return PerTargetOutcome::AlreadyInstalled { target: raw };
    }

    let result = run_pipeline_locked(op_id, &raw, &plan, &install_path, ctx.clone(), global).await;
    drop(lock);

    match result {
        Ok((final_path, warning)) => {
            ctx.events().emit(InstallerEvent::OperationComplete {
                op_id,
                target: raw.clone(),
            });
            PerTargetOutcome::Installed {
                target: raw,
                path: final_path,
                warning,
            }
        }
        Err(e) => failure_outcome(raw, e),
    }
}

fn failure_outcome(target: String, error: InstallerError) -> PerTargetOutcome {
    PerTargetOutcome::Failed {
        kind: error.kind(),
        message: error.to_string(),
        target,
    }
}

async fn acquire_lock_with_retry(
    install_path: &std::path::Path,
    ctx: Arc<InstallerContext>,
) -> InstallerResult<InstallLock> {
    let path = install_path.to_path_buf();
    for _ in 0..LOCK_RETRY_ATTEMPTS {
        if ctx.cancellation().is_cancelled() {
            return Err(InstallerError::Cancelled {
                target: install_path.display().to_string(),
            });
        }

        let path = path.clone();
        let attempt = tokio::task::spawn_blocking(move || InstallLock::try_acquire(&path))
            .await
            .map_err(|e| InstallerError::Internal(e.to_string()))??;

        if let Some(lock) = attempt {
            return Ok(lock);
        }
        tokio::time::sleep(LOCK_RETRY_DELAY).await;
    }

    tokio::task::spawn_blocking(move || InstallLock::acquire(&path))
        .await
        .map_err(|e| InstallerError::Internal(e.to_string()))?
        .map_err(InstallerError::from)
}

async fn run_pipeline_locked(
    op_id: u64,
    target: &str,
    plan: &TargetPlan,
    install_path: &std::path::Path,
    ctx: Arc<InstallerContext>,
    global: &dyn GlobalConfigProvider,
) -> InstallerResult<(PathBuf, Option<String>)> {
    // Stage 1: resolve.
    ctx.events().emit(InstallerEvent::Resolving {
        op_id,
        target: target.to_string(),
    });
    let (release, asset) = resolve_release_and_asset(op_id, target, plan, ctx.clone()).await?;

    // Stage 2: download.
    let download_dir = ctx.options().download_dir.clone();
    appimg_utils::fs::ensure_dir_exists(&download_dir)?;
    let tmp_path = download_dir.join(&asset.name);
    download_asset(op_id, target, &asset, &tmp_path, &ctx, global).await?;

    // Stage 3: verify.
    ctx.events().emit(InstallerEvent::Verifying {
        op_id,
        target: target.to_string(),
        stage: VerifyStage::Digest,
    });
    let verification = verify_asset(&tmp_path, &asset, plan, &release).await;
    let (verification, verify_warning) = match verification {
        Ok(v) => {
            let stage = if v.passed && v.warning.is_none() {
                VerifyStage::Passed
            } else {
                VerifyStage::Unverified
            };
            ctx.events().emit(InstallerEvent::Verifying {
                op_id,
                target: target.to_string(),
                stage,
            });
            (v.clone(), v.warning)
        }
        Err(e) => {
            appimg_utils::fs::safe_remove(&tmp_path).ok();
            ctx.events().emit(InstallerEvent::Verifying {
                op_id,
                target: target.to_string(),
                stage: VerifyStage::Failed(e.to_string()),
            });
            return Err(InstallerError::Verification(e));
        }
    };

    // Stage 4: install.
    ctx.events().emit(InstallerEvent::Installing {
        op_id,
        target: target.to_string(),
        stage: InstallStage::Moving,
    });
    file_ops::move_file(&tmp_path, install_path)?;
    ctx.events().emit(InstallerEvent::Installing {
        op_id,
        target: target.to_string(),
        stage: InstallStage::SettingPermissions,
    });
    ctx.events().emit(InstallerEvent::Installing {
        op_id,
        target: target.to_string(),
        stage: InstallStage::Complete,
    });

    // Stage 5: icon (non-fatal).
    ctx.events().emit(InstallerEvent::AcquiringIcon {
        op_id,
        target: target.to_string(),
        stage: IconStage::Extracting,
    });
    let config_dir = appimg_utils::path::xdg_config_home().join("appimg");
    let current_icon_policy = config_store::read_record(&config_dir, &plan.app_name)
        .ok()
        .flatten()
        .and_then(|record| record.overrides.map(|o| o.icon));
    let icon_policy = effective_icon_policy(current_icon_policy, &plan.icon);
    let icon_record =
        acquire_icon(op_id, target, &plan.app_name, &icon_policy, install_path, global, &ctx).await;

    // Stage 6: persist config.
    let record = build_config_record(plan, &release, install_path, &verification, &icon_record);
    config_store::write_record(&config_dir, &plan.app_name, &record)?;
    ctx.events().emit(InstallerEvent::ConfigWritten {
        op_id,
        target: target.to_string(),
    });

    // Stage 7: desktop entry (non-fatal).
    let icon_path = icon_record.path.as_ref().map(PathBuf::from);
    if desktop::write_desktop_entry(
        &plan.app_name,
        install_path,
        icon_path.as_deref(),
        &format!("{}, installed via appimg", plan.app_name),
    )
    .is_ok()
    {
        ctx.events().emit(InstallerEvent::DesktopEntryWritten {
            op_id,
            target: target.to_string(),
        });
    }

    Ok((install_path.to_path_buf(), verify_warning))
}

async fn resolve_release_and_asset(
    op_id: u64,
    target: &str,
    plan: &TargetPlan,
    ctx: Arc<InstallerContext>,
) -> InstallerResult<(Release, Asset)> {
    let owner = plan.owner.clone();
    let repo = plan.repo.clone();
    let tag = plan.tag.clone();
    let prerelease = plan.prerelease;
    let ignore_cache = ctx.options().force;

    // fetch_* blocks on the shared synchronous HTTP agent; run it off the async runtime's
    // worker threads rather than stalling them on network I/O.
    let ctx_for_fetch = ctx.clone();
    let release = tokio::task::spawn_blocking(move || {
        let resolver = ctx_for_fetch.resolver();
        if let Some(tag) = tag {
            resolver.fetch_release_by_tag(&owner, &repo, &tag)
        } else {
            resolver.fetch_preferred(&owner, &repo, prerelease, ignore_cache)
        }
    })
    .await
    .map_err(|e| InstallerError::Internal(e.to_string()))??;

    ctx.events().emit(InstallerEvent::SelectingAsset {
        op_id,
        target: target.to_string(),
        candidate_count: release.assets.len(),
    });

    let source = match plan.install_source {
        InstallSource::Url => InstallationSource::Url,
        InstallSource::Catalog => InstallationSource::Catalog,
    };

    let asset = select_appimage(&release.assets, &plan.preferred_suffixes, source)
        .cloned()
        .ok_or_else(|| InstallerError::AssetNotFound {
            target: target.to_string(),
        })?;

    Ok((release, asset))
}

async fn download_asset(
    op_id: u64,
    target: &str,
    asset: &Asset,
    destination: &std::path::Path,
    ctx: &InstallerContext,
    global: &dyn GlobalConfigProvider,
) -> InstallerResult<()> {
    let events = ctx.events().clone();
    let op_id_for_progress = op_id;
    let target_for_progress = target.to_string();

    let download = appimg_dl::Download::new(asset.url.clone(), destination.to_path_buf())
        .max_attempts(global.max_retries())
        .timeout(global.request_timeout())
        .cancellation(ctx.cancellation())
        .progress(ctx.progress().clone())
        .task_name(asset.name.clone())
        .on_progress(move |progress| {
            let event = match progress {
                DlProgress::Starting { total } => InstallerEvent::DownloadStarting {
                    op_id: op_id_for_progress,
                    target: target_for_progress.clone(),
                    total,
                },
                DlProgress::Resuming { current, total } => InstallerEvent::DownloadResuming {
                    op_id: op_id_for_progress,
                    target: target_for_progress.clone(),
                    current,
                    total,
                },
                DlProgress::Chunk { current, total } => InstallerEvent::DownloadProgress {
                    op_id: op_id_for_progress,
                    target: target_for_progress.clone(),
                    current,
                    total,
                },
                DlProgress::Complete { total } => InstallerEvent::DownloadComplete {
                    op_id: op_id_for_progress,
                    target: target_for_progress.clone(),
                    total,
                },
                DlProgress::Retry { attempt } => InstallerEvent::DownloadRetry {
                    op_id: op_id_for_progress,
                    target: target_for_progress.clone(),
                    attempt,
                },
                DlProgress::Aborted => InstallerEvent::DownloadAborted {
                    op_id: op_id_for_progress,
                    target: target_for_progress.clone(),
                },
                DlProgress::Recovered => InstallerEvent::DownloadRecovered {
                    op_id: op_id_for_progress,
                    target: target_for_progress.clone(),
                },
            };
            events.emit(event);
        });

    tokio::task::spawn_blocking(move || download.execute())
        .await
        .map_err(|e| InstallerError::Internal(e.to_string()))?
        .map_err(InstallerError::from)?;

    Ok(())
}

async fn verify_asset(
    file_path: &std::path::Path,
    asset: &Asset,
    plan: &TargetPlan,
    release: &Release,
) -> Result<appimg_verify::VerificationResult, appimg_verify::VerificationError> {
    let file_path = file_path.to_path_buf();
    let asset = asset.clone();
    let config: appimg_verify::VerificationConfig = (&plan.verification).into();
    let owner = plan.owner.clone();
    let repo = plan.repo.clone();
    let tag = release.original_tag_name.clone();
    let version = release.version.clone();
    let all_assets = release.assets.clone();

    tokio::task::spawn_blocking(move || {
        appimg_verify::verify_file(
            &file_path,
            &asset,
            &config,
            &owner,
            &repo,
            &tag,
            &version,
            Some(&all_assets),
        )
    })
    .await
    .expect("verification task panicked")
}

/// Resolves the icon policy to act on: a previously-persisted record's override wins if
/// present, otherwise the catalog/URL-default policy already resolved into `plan.icon`
/// (which itself falls back to `IconPolicy::default()`, extraction enabled).
fn effective_icon_policy(current: Option<IconPolicy>, plan_icon: &IconPolicy) -> IconPolicy {
    current.unwrap_or_else(|| plan_icon.clone())
}

async fn acquire_icon(
    op_id: u64,
    target: &str,
    app_name: &str,
    icon_policy: &IconPolicy,
    install_path: &std::path::Path,
    global: &dyn GlobalConfigProvider,
    ctx: &InstallerContext,
) -> IconRecord {
    let extraction_enabled = icon_policy.extraction;

    let extracted = if extraction_enabled {
        icon::extract_icon(install_path, app_name).await
    } else {
        None
    };

    let extracted = match extracted {
        Some(icon) => Some(icon),
        None => {
            ctx.events().emit(InstallerEvent::AcquiringIcon {
                op_id,
                target: target.to_string(),
                stage: IconStage::Downloading,
            });
            match icon_policy.icon_url.as_deref() {
                Some(url) => {
                    let dest = global.icons_dir().join(format!("{app_name}.png"));
                    icon::download_icon(url, &dest).await
                }
                None => None,
            }
        }
    };

    match extracted {
        Some(icon) => {
            let icons_dir = global.icons_dir();
            appimg_utils::fs::ensure_dir_exists(&icons_dir).ok();
            let extension = icon
                .path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("png");
            let final_path = icons_dir.join(format!("{app_name}.{extension}"));
            let installed = appimg_utils::fs::create_symlink(&icon.path, &final_path).is_ok()
                || std::fs::copy(&icon.path, &final_path).is_ok();

            let source_label = match icon.source {
                appimg_events::IconSource::Extraction => "extraction",
                appimg_events::IconSource::Github => "github",
            };

            ctx.events().emit(InstallerEvent::AcquiringIcon {
                op_id,
                target: target.to_string(),
                stage: IconStage::Complete { source: icon.source },
            });

            IconRecord {
                installed,
                method: Some(source_label.to_string()),
                path: if installed {
                    Some(final_path.display().to_string())
                } else {
                    None
                },
            }
        }
        None => {
            ctx.events().emit(InstallerEvent::AcquiringIcon {
                op_id,
                target: target.to_string(),
                stage: IconStage::None,
            });
            IconRecord {
                installed: false,
                method: None,
                path: None,
            }
        }
    }
}

fn build_config_record(
    plan: &TargetPlan,
    release: &Release,
    install_path: &std::path::Path,
    verification: &appimg_verify::VerificationResult,
    icon: &IconRecord,
) -> AppConfigRecord {
    let overrides = match plan.install_source {
        InstallSource::Url => Some(UrlOverrides {
            owner: plan.owner.clone(),
            repo: plan.repo.clone(),
            prerelease: plan.prerelease,
            naming_template: plan.naming_template.clone(),
            verification: (&verification.config).into(),
            icon: plan.icon.clone(),
        }),
        InstallSource::Catalog => None,
    };

    AppConfigRecord {
        config_version: CONFIG_VERSION.to_string(),
        source: plan.install_source,
        catalog_ref: plan.catalog_ref.clone(),
        overrides,
        state: StateRecord {
            version: release.version.clone(),
            installed_date: chrono::Utc::now().to_rfc3339(),
            installed_path: install_path.display().to_string(),
            verification: verification.clone().into(),
            icon: icon.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_url_without_tag() {
        let (owner, repo, tag) = parse_github_url("https://github.com/acme/widget").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widget");
        assert!(tag.is_none());
    }

    #[test]
    fn test_parse_github_url_with_tag() {
        let (owner, repo, tag) = parse_github_url("https://github.com/acme/widget@v1.2.0").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widget");
        assert_eq!(tag.as_deref(), Some("v1.2.0"));
    }

    #[test]
    fn test_parse_github_url_rejects_owner_only() {
        assert!(parse_github_url("https://github.com/acme").is_none());
    }

    #[test]
    fn test_parse_github_url_rejects_non_github() {
        assert!(parse_github_url("https://gitlab.com/acme/widget").is_none());
    }

    #[test]
    fn test_effective_icon_policy_prefers_persisted_record_over_catalog() {
        let catalog_policy = IconPolicy {
            extraction: true,
            icon_url: None,
            preserve_url_on_extraction: false,
        };
        let persisted_policy = IconPolicy {
            extraction: false,
            icon_url: Some("https://example.com/icon.png".to_string()),
            preserve_url_on_extraction: true,
        };

        let resolved = effective_icon_policy(Some(persisted_policy.clone()), &catalog_policy);

        assert_eq!(resolved.extraction, persisted_policy.extraction);
        assert_eq!(resolved.icon_url, persisted_policy.icon_url);
    }

    #[test]
    fn test_effective_icon_policy_falls_back_to_catalog_without_persisted_record() {
        let catalog_policy = IconPolicy {
            extraction: false,
            icon_url: Some("https://example.com/icon.png".to_string()),
            preserve_url_on_extraction: false,
        };

        let resolved = effective_icon_policy(None, &catalog_policy);

        assert_eq!(resolved.extraction, catalog_policy.extraction);
        assert_eq!(resolved.icon_url, catalog_policy.icon_url);
    }
}
