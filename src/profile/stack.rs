//! Tech stack detection from manifests and marker files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::profile::tables::{StackRule, JVM_BUILD_FILES, NPM_MANIFEST, PYTHON_REQUIREMENT_FILES};
use crate::profile::tree::ScannedFile;

/// Dependency sections of a `package.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Sources a project declares its stack in.
#[derive(Debug, Default)]
struct StackSources {
    npm_dependencies: Vec<String>,
    python: String,
    jvm: String,
    file_names: BTreeSet<String>,
}

/// Names every rule that matches the project, sorted.
///
/// Manifests are read from the project root only. Unreadable or malformed
/// manifests contribute nothing.
pub fn detect_stack(root: &Path, files: &[ScannedFile], rules: &[StackRule]) -> Vec<String> {
    let sources = collect_sources(root, files);

    let mut stack = BTreeSet::new();
    for rule in rules {
        let npm = sources
            .npm_dependencies
            .iter()
            .any(|dep| rule.npm.iter().any(|k| dep.contains(k)));
        let python = rule.python.iter().any(|k| sources.python.contains(k));
        let jvm = rule.jvm.iter().any(|k| sources.jvm.contains(k));
        let marker = rule.markers.iter().any(|m| sources.file_names.contains(*m));
        if npm || python || jvm || marker {
            stack.insert(rule.name.to_string());
        }
    }
    stack.into_iter().collect()
}

fn collect_sources(root: &Path, files: &[ScannedFile]) -> StackSources {
    let mut sources = StackSources::default();

    for file in files {
        let name = file.name();
        if file.is_top_level() {
            if name == NPM_MANIFEST {
                if let Some(content) = read(root, file) {
                    sources.npm_dependencies = npm_dependencies(&content, file);
                }
            } else if PYTHON_REQUIREMENT_FILES.contains(&name.as_str()) {
                if let Some(content) = read(root, file) {
                    sources.python.push_str(&content.to_lowercase());
                    sources.python.push('\n');
                }
            } else if JVM_BUILD_FILES.contains(&name.as_str()) {
                if let Some(content) = read(root, file) {
                    sources.jvm.push_str(&content.to_lowercase());
                    sources.jvm.push('\n');
                }
            }
        }
        sources.file_names.insert(name);
    }
    sources
}

fn npm_dependencies(content: &str, file: &ScannedFile) -> Vec<String> {
    match serde_json::from_str::<PackageManifest>(content) {
        Ok(manifest) => manifest
            .dependencies
            .into_keys()
            .chain(manifest.dev_dependencies.into_keys())
            .map(|name| name.to_lowercase())
            .collect(),
        Err(e) => {
            warn!(path = %file.relative.display(), error = %e, "ignoring malformed package manifest");
            Vec::new()
        }
    }
}

fn read(root: &Path, file: &ScannedFile) -> Option<String> {
    match fs::read(root.join(&file.relative)) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            debug!(path = %file.relative.display(), error = %e, "skipping unreadable manifest");
            None
        }
    }
}
