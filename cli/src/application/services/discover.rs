//! Application service — release artifact discovery.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Everything here runs before any remote action.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::LocalFs;
use crate::domain::artifact::{
    self, ChecksumStatus, ReleaseArtifacts, UpdateManifest, VERSION_DESCRIPTOR,
};
use crate::domain::config::DeployConfig;
use crate::domain::error::ArtifactError;

/// Located artifacts plus non-fatal findings for the operator.
#[derive(Debug)]
pub struct Discovery {
    pub artifacts: ReleaseArtifacts,
    pub manifest: UpdateManifest,
    pub warnings: Vec<String>,
}

/// Read the project version from `package.json`.
///
/// # Errors
///
/// Returns an `ArtifactError` if the file is missing, has no `version`, or
/// the version is not valid semver.
pub fn read_version(fs: &impl LocalFs, project_dir: &Path) -> Result<String> {
    let path = project_dir.join(VERSION_DESCRIPTOR);
    if !fs.is_file(&path) {
        return Err(ArtifactError::DescriptorNotFound(path).into());
    }
    let content = fs.read_to_string(&path)?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    let version = json
        .get("version")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ArtifactError::MissingVersion(path.clone()))?;
    semver::Version::parse(version).map_err(|e| ArtifactError::InvalidVersion {
        version: version.to_string(),
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(version.to_string())
}

/// Locate the manifest, installer and optional blockmap for this release.
///
/// # Errors
///
/// Returns an `ArtifactError` when the release directory, manifest or
/// installer is missing, or when the installer hash disagrees with the
/// manifest (unless verification is skipped).
pub fn discover(fs: &impl LocalFs, cfg: &DeployConfig) -> Result<Discovery> {
    let version = read_version(fs, &cfg.project_dir)?;
    let release_dir = cfg
        .release_dir
        .clone()
        .unwrap_or_else(|| artifact::release_dir(&cfg.project_dir, &version));
    if !fs.is_dir(&release_dir) {
        return Err(ArtifactError::ReleaseDirNotFound(release_dir).into());
    }
    tracing::debug!(dir = %release_dir.display(), %version, "scanning release directory");

    let entries = fs.list_files(&release_dir)?;
    let mut warnings = Vec::new();

    let manifest_name = find_manifest(&entries, cfg)
        .ok_or_else(|| ArtifactError::ManifestNotFound(release_dir.clone()))?;
    let manifest_path = release_dir.join(&manifest_name);
    let manifest = UpdateManifest::parse(&fs.read_to_string(&manifest_path)?)
        .with_context(|| format!("cannot parse manifest {}", manifest_path.display()))?;
    if manifest_name != artifact::manifest_name(cfg.platform) {
        warnings.push(format!(
            "Using {manifest_name}; {} was not found",
            artifact::manifest_name(cfg.platform)
        ));
    }
    if let Some(v) = manifest.version.as_deref().filter(|v| *v != version) {
        warnings.push(format!(
            "Manifest version {v} differs from {VERSION_DESCRIPTOR} version {version}"
        ));
    }

    let installer_name = match manifest.installer_name() {
        Some(name) if entries.iter().any(|e| e == name) => name.to_string(),
        Some(name) => {
            return Err(ArtifactError::ManifestInstallerMissing {
                manifest: manifest_name,
                file: name.to_string(),
                dir: release_dir,
            }
            .into());
        }
        None => scan_for_installer(&entries, cfg, &version).ok_or_else(|| {
            ArtifactError::InstallerNotFound {
                dir: release_dir.clone(),
                version: version.clone(),
            }
        })?,
    };
    let installer = release_dir.join(&installer_name);

    let blockmap_name = artifact::blockmap_name(&installer_name);
    let blockmap = entries
        .contains(&blockmap_name)
        .then(|| release_dir.join(&blockmap_name));

    let checksum = if cfg.skip_verify {
        ChecksumStatus::Skipped
    } else if let Some(expected) = manifest.expected_sha512(&installer_name) {
        let actual = fs.sha512_base64(&installer)?;
        if actual != expected {
            return Err(ArtifactError::ChecksumMismatch {
                file: installer_name,
                expected: expected.to_string(),
                actual,
            }
            .into());
        }
        ChecksumStatus::Verified
    } else {
        warnings.push(format!("Manifest has no sha512 for {installer_name}; not verified"));
        ChecksumStatus::Unavailable
    };

    Ok(Discovery {
        artifacts: ReleaseArtifacts {
            version,
            release_dir,
            installer,
            blockmap,
            manifest: manifest_path,
            checksum,
        },
        manifest,
        warnings,
    })
}

/// Fixed candidate order first, then any `latest*.yml` in name order.
fn find_manifest(entries: &[String], cfg: &DeployConfig) -> Option<String> {
    artifact::manifest_candidates(cfg.platform)
        .into_iter()
        .find(|name| entries.iter().any(|e| e == name))
        .map(str::to_string)
        .or_else(|| {
            entries
                .iter()
                .find(|e| artifact::is_manifest_name(e))
                .cloned()
        })
}

/// Used only when the manifest does not name its installer.
fn scan_for_installer(entries: &[String], cfg: &DeployConfig, version: &str) -> Option<String> {
    entries
        .iter()
        .find(|e| artifact::is_installer_name(e, cfg.platform, version))
        .cloned()
}
