//! Release artifact naming rules and the update manifest schema.
//!
//! Pure functions only — the filesystem walk lives in
//! `application::services::discover`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::config::Platform;

/// File holding the release version, relative to the project directory.
pub const VERSION_DESCRIPTOR: &str = "package.json";

/// Directory under the project holding one subdirectory per version.
pub const RELEASE_ROOT: &str = "release";

/// Fixed manifest fallback order after the platform's own name.
pub const FALLBACK_MANIFESTS: &[&str] = &[
    "latest.yml",
    "latest-mac.yml",
    "latest-linux.yml",
    "latest-linux-arm64.yml",
];

pub const BLOCKMAP_SUFFIX: &str = ".blockmap";

/// Default release directory: `<project>/release/<version>`.
#[must_use]
pub fn release_dir(project_dir: &Path, version: &str) -> PathBuf {
    project_dir.join(RELEASE_ROOT).join(version)
}

/// Manifest file name the auto-updater requests for `platform`.
#[must_use]
pub fn manifest_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Win => "latest.yml",
        Platform::Mac => "latest-mac.yml",
        Platform::Linux => "latest-linux.yml",
    }
}

/// Ordered, de-duplicated manifest names to try before scanning.
#[must_use]
pub fn manifest_candidates(platform: Platform) -> Vec<&'static str> {
    let mut names = vec![manifest_name(platform)];
    for name in FALLBACK_MANIFESTS {
        if !names.contains(name) {
            names.push(name);
        }
    }
    names
}

/// Whether a directory entry looks like an update manifest.
#[must_use]
pub fn is_manifest_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("latest") && (lower.ends_with(".yml") || lower.ends_with(".yaml"))
}

/// Installer file extensions produced for `platform`.
#[must_use]
pub fn installer_extensions(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Win => &[".exe"],
        Platform::Mac => &[".dmg", ".zip"],
        Platform::Linux => &[".appimage", ".deb", ".rpm"],
    }
}

/// Whether `name` is an installer for `version` on `platform`.
#[must_use]
pub fn is_installer_name(name: &str, platform: Platform, version: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !name.starts_with('.')
        && name.contains(version)
        && installer_extensions(platform)
            .iter()
            .any(|ext| lower.ends_with(ext))
}

/// Blockmap companion name for an installer.
#[must_use]
pub fn blockmap_name(installer: &str) -> String {
    format!("{installer}{BLOCKMAP_SUFFIX}")
}

// ── Manifest schema ──────────────────────────────────────────────────────────

/// One entry of the manifest's `files` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestFile {
    pub url: String,
    #[serde(default)]
    pub sha512: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// The `latest*.yml` document consumed by the auto-updater.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateManifest {
    pub version: Option<String>,
    pub path: Option<String>,
    pub sha512: Option<String>,
    pub files: Vec<ManifestFile>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
}

impl UpdateManifest {
    /// # Errors
    ///
    /// Returns the YAML error if `content` is not a manifest document.
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Installer file name the manifest points at: `path`, else the first
    /// non-blockmap entry of `files`.
    #[must_use]
    pub fn installer_name(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty()).or_else(|| {
            self.files
                .iter()
                .map(|f| f.url.as_str())
                .find(|u| !u.ends_with(BLOCKMAP_SUFFIX))
        })
    }

    /// Expected base64 SHA-512 of `file_name`, if the manifest records one.
    #[must_use]
    pub fn expected_sha512(&self, file_name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.url == file_name)
            .and_then(|f| f.sha512.as_deref())
            .or_else(|| {
                (self.path.as_deref() == Some(file_name))
                    .then_some(self.sha512.as_deref())
                    .flatten()
            })
    }
}

// ── Discovery result ─────────────────────────────────────────────────────────

/// Outcome of comparing the installer against the manifest hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumStatus {
    Verified,
    Skipped,
    Unavailable,
}

/// Files located for one release.
#[derive(Debug, Clone)]
pub struct ReleaseArtifacts {
    pub version: String,
    pub release_dir: PathBuf,
    pub installer: PathBuf,
    pub blockmap: Option<PathBuf>,
    pub manifest: PathBuf,
    pub checksum: ChecksumStatus,
}

impl ReleaseArtifacts {
    /// Upload and install order. The manifest goes last so updaters never
    /// see it before the installer it references.
    #[must_use]
    pub fn install_order(&self) -> Vec<&Path> {
        let mut files = vec![self.installer.as_path()];
        if let Some(blockmap) = &self.blockmap {
            files.push(blockmap.as_path());
        }
        files.push(self.manifest.as_path());
        files
    }
}

/// File name component of `path` as UTF-8, if it has one.
#[must_use]
pub fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
