//! Build artifact checks: a package manager is available and the federation
//! entry bundle was produced.

use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Ok { path: PathBuf, bytes: u64 },
    Missing { path: PathBuf },
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleReport {
    /// First package manager found on `PATH`, with its location.
    pub package_manager: Option<(String, PathBuf)>,
    pub artifact: ArtifactStatus,
}

impl BundleReport {
    pub fn is_ok(&self) -> bool {
        self.package_manager.is_some() && matches!(self.artifact, ArtifactStatus::Ok { .. })
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.package_manager.is_none() {
            problems.push("No package manager (npm, yarn or pnpm) found on PATH".to_string());
        }
        match &self.artifact {
            ArtifactStatus::Ok { .. } => {}
            ArtifactStatus::Missing { path } => {
                problems.push(format!("{} not found; run the build first", path.display()))
            }
            ArtifactStatus::Empty { path } => problems.push(format!("{} is empty", path.display())),
        }
        problems
    }
}

/// Look `name` up on a `PATH`-style search list.
pub fn find_executable(name: &str, search_path: &std::ffi::OsStr) -> Option<PathBuf> {
    let suffixes: &[&str] = if cfg!(windows) { &[".cmd", ".exe", ""] } else { &[""] };
    std::env::split_paths(search_path).find_map(|dir| {
        suffixes
            .iter()
            .map(|suffix| dir.join(format!("{name}{suffix}")))
            .find(|candidate| candidate.is_file())
    })
}

pub fn check_artifact(dist_dir: &Path, entry: &str) -> ArtifactStatus {
    let path = dist_dir.join(entry);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => ArtifactStatus::Ok { path, bytes: meta.len() },
        Ok(meta) if meta.is_file() => ArtifactStatus::Empty { path },
        _ => ArtifactStatus::Missing { path },
    }
}

pub fn check_bundle_with(
    dist_dir: &Path,
    entry: &str,
    package_managers: &[String],
    search_path: &std::ffi::OsStr,
) -> BundleReport {
    let package_manager = package_managers
        .iter()
        .find_map(|pm| find_executable(pm, search_path).map(|path| (pm.clone(), path)));
    BundleReport { package_manager, artifact: check_artifact(dist_dir, entry) }
}

/// Check against the process `PATH`.
pub fn check_bundle(dist_dir: &Path, entry: &str, package_managers: &[String]) -> BundleReport {
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    check_bundle_with(dist_dir, entry, package_managers, &search_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn managers() -> Vec<String> {
        vec!["npm".into(), "yarn".into(), "pnpm".into()]
    }

    #[test]
    fn finds_first_available_manager_and_artifact() {
        let bin = tempfile::tempdir().unwrap();
        std::fs::write(bin.path().join(if cfg!(windows) { "pnpm.cmd" } else { "pnpm" }), "").unwrap();
        let dist = tempfile::tempdir().unwrap();
        std::fs::write(dist.path().join("remoteEntry.js"), "var plugin;").unwrap();

        let report = check_bundle_with(dist.path(), "remoteEntry.js", &managers(), bin.path().as_os_str());
        assert_eq!(report.package_manager.as_ref().map(|(n, _)| n.as_str()), Some("pnpm"));
        assert!(matches!(report.artifact, ArtifactStatus::Ok { bytes: 11, .. }));
        assert!(report.is_ok());
    }

    #[test]
    fn reports_missing_and_empty() {
        let empty_path = tempfile::tempdir().unwrap();
        let dist = tempfile::tempdir().unwrap();
        let report = check_bundle_with(dist.path(), "remoteEntry.js", &managers(), empty_path.path().as_os_str());
        assert!(!report.is_ok());
        assert_eq!(report.problems().len(), 2);

        std::fs::write(dist.path().join("remoteEntry.js"), "").unwrap();
        assert!(matches!(check_artifact(dist.path(), "remoteEntry.js"), ArtifactStatus::Empty { .. }));
    }
}
