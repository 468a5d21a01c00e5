//! File tree walking and profiling.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::profile::stack::detect_stack;
use crate::profile::tables::{
    extension_key, is_readme, ClassificationTables, FileCategory, Language,
};

/// Histogram key for files without an extension.
pub const NO_EXTENSION: &str = "(none)";

/// Version-control metadata directory excluded from every walk.
const VCS_DIR: &str = ".git";

/// A file found during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path relative to the scanned root.
    pub relative: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Lowercase extension key, see [`extension_key`].
    pub extension: Option<String>,
    /// Category by extension.
    pub category: FileCategory,
}

impl ScannedFile {
    /// Returns the file name component.
    pub fn name(&self) -> String {
        self.relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Returns true when the file sits directly in the scanned root.
    pub fn is_top_level(&self) -> bool {
        self.relative.components().count() == 1
    }

    /// Returns the relative path with forward slashes.
    pub fn display_path(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Structural summary of a repository's working tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTreeProfile {
    /// All regular files outside `.git`.
    pub total_files: usize,
    /// Files with a code extension.
    pub code_files: usize,
    /// Files with a documentation extension.
    pub doc_files: usize,
    /// Files with a configuration extension.
    pub config_files: usize,
    /// Everything else.
    pub other_files: usize,
    /// Directories below the root, excluding `.git`.
    pub directories: usize,
    /// Total file size in kilobytes, two decimals.
    pub size_kb: f64,
    /// Files per extension key.
    pub file_types: BTreeMap<String, usize>,
    /// README files, relative paths.
    pub readme_files: Vec<String>,
    /// At least one README exists.
    pub has_readme: bool,
    /// At least one dependency manifest exists.
    pub has_manifest: bool,
    /// At least one container definition exists.
    pub has_container: bool,
    /// Files per mapped language.
    #[serde(default)]
    pub languages: BTreeMap<Language, usize>,
    /// Most common mapped language.
    pub primary_language: Option<Language>,
    /// Frameworks and platforms found in manifests and marker files, sorted.
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Entries that could not be read and were skipped.
    pub unreadable_entries: usize,
}

/// Result of a single tree walk.
#[derive(Debug, Clone, Default)]
pub struct TreeScan {
    /// Aggregated profile.
    pub profile: FileTreeProfile,
    /// Every regular file found, in walk order.
    pub files: Vec<ScannedFile>,
}

/// Walks a working tree and classifies its files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTreeProfiler {
    tables: ClassificationTables,
}

impl FileTreeProfiler {
    /// Creates a profiler with the given tables.
    pub fn new(tables: ClassificationTables) -> Self {
        Self { tables }
    }

    /// Returns the tables in use.
    pub fn tables(&self) -> &ClassificationTables {
        &self.tables
    }

    /// Walks `root`, skipping `.git`.
    ///
    /// A missing root yields an empty scan. Entries that cannot be read are
    /// counted in [`FileTreeProfile::unreadable_entries`] and skipped.
    pub fn scan(&self, root: &Path) -> TreeScan {
        let mut scan = TreeScan::default();
        if !root.exists() {
            return scan;
        }

        let mut total_bytes = 0u64;

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != VCS_DIR);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "skipping unreadable entry");
                    scan.profile.unreadable_entries += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                scan.profile.directories += 1;
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                    scan.profile.unreadable_entries += 1;
                    continue;
                }
            };

            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let extension = extension_key(&relative);
            let file = ScannedFile {
                category: self.tables.categorize(extension.as_deref()),
                extension,
                relative,
                size,
            };

            total_bytes += size;
            self.record(&mut scan.profile, &file);
            scan.files.push(file);
        }

        scan.profile.size_kb = round2(total_bytes as f64 / 1024.0);
        scan.profile.primary_language = self.primary_language(&scan.profile.languages);
        scan.profile.tech_stack = detect_stack(root, &scan.files, self.tables.stack);
        scan
    }

    fn record(&self, profile: &mut FileTreeProfile, file: &ScannedFile) {
        profile.total_files += 1;

        let key = file.extension.as_deref().unwrap_or(NO_EXTENSION);
        *profile.file_types.entry(key.to_string()).or_insert(0) += 1;

        match file.category {
            FileCategory::Code => profile.code_files += 1,
            FileCategory::Doc => profile.doc_files += 1,
            FileCategory::Config => profile.config_files += 1,
            FileCategory::Other => profile.other_files += 1,
        }

        if let Some(language) = file
            .extension
            .as_deref()
            .and_then(|ext| self.tables.language_of(ext))
        {
            *profile.languages.entry(language).or_insert(0) += 1;
        }

        let name = file.name();
        if is_readme(&name) {
            profile.has_readme = true;
            profile.readme_files.push(file.display_path());
        }
        if self.tables.is_manifest(&name) {
            profile.has_manifest = true;
        }
        if self.tables.is_container(&name) {
            profile.has_container = true;
        }
    }

    /// First language in table order reaching the highest count.
    fn primary_language(&self, counts: &BTreeMap<Language, usize>) -> Option<Language> {
        let mut best: Option<(Language, usize)> = None;
        for (language, _) in self.tables.languages {
            let count = counts.get(language).copied().unwrap_or(0);
            if count > 0 && best.map_or(true, |(_, max)| count > max) {
                best = Some((*language, count));
            }
        }
        best.map(|(language, _)| language)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "README.md", "# Shop\n");
        write(root, "requirements.txt", "flask\npytest\n");
        write(root, "Dockerfile", "FROM python:3.12\n");
        write(root, "app/main.py", "print('hi')\n");
        write(root, "app/models.py", "class Item: pass\n");
        write(root, "web/index.js", "console.log(1)\n");
        write(root, "config.yaml", "debug: true\n");
        write(root, ".gitignore", "*.pyc\n");
        write(root, ".git/HEAD", "ref: refs/heads/main\n");
        write(root, ".git/objects/ab/cdef", "blob");
        dir
    }

    #[test]
    fn profiles_a_project() {
        let dir = project();
        let scan = FileTreeProfiler::default().scan(dir.path());
        let profile = &scan.profile;

        assert_eq!(profile.total_files, 8);
        assert_eq!(profile.code_files, 3);
        assert_eq!(profile.doc_files, 2); // README.md, requirements.txt
        assert_eq!(profile.config_files, 2);
        assert_eq!(profile.other_files, 1); // Dockerfile
        assert_eq!(profile.directories, 2);
        assert!(profile.has_readme);
        assert!(profile.has_manifest);
        assert!(profile.has_container);
        assert_eq!(profile.readme_files, vec!["README.md".to_string()]);
        assert_eq!(profile.primary_language, Some(Language::Python));
        assert_eq!(
            profile.languages,
            BTreeMap::from([(Language::Python, 2), (Language::JavaScript, 1)])
        );
        assert_eq!(profile.tech_stack, vec!["Docker", "Flask"]);
        assert_eq!(profile.file_types.get("py"), Some(&2));
        assert_eq!(profile.file_types.get(NO_EXTENSION), Some(&1));
        assert_eq!(profile.file_types.get("gitignore"), Some(&1));
        assert_eq!(profile.unreadable_entries, 0);
        assert_eq!(scan.files.len(), 8);
        assert!(scan
            .files
            .iter()
            .all(|f| !f.relative.starts_with(".git")));
    }

    #[test]
    fn language_tie_uses_table_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.js", "");
        write(dir.path(), "b.py", "");
        let scan = FileTreeProfiler::default().scan(dir.path());
        assert_eq!(scan.profile.primary_language, Some(Language::Python));
        assert_eq!(scan.profile.languages.values().sum::<usize>(), 2);
    }

    #[test]
    fn no_language_without_mapped_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "notes.md", "");
        let scan = FileTreeProfiler::default().scan(dir.path());
        assert_eq!(scan.profile.primary_language, None);
        assert!(scan.profile.languages.is_empty());
    }

    #[test]
    fn size_is_rounded_kilobytes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "data.bin", &"x".repeat(1536));
        write(dir.path(), "small.txt", "abc");
        let scan = FileTreeProfiler::default().scan(dir.path());
        // 1539 bytes
        assert!((scan.profile.size_kb - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_root_yields_empty_profile() {
        let scan = FileTreeProfiler::default().scan(Path::new("/definitely/not/here"));
        assert_eq!(scan.profile, FileTreeProfile::default());
        assert!(scan.files.is_empty());
    }

    #[test]
    fn substituted_tables() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.zig", "");
        let tables = ClassificationTables {
            code: &["zig"],
            ..ClassificationTables::default()
        };
        let scan = FileTreeProfiler::new(tables).scan(dir.path());
        assert_eq!(scan.profile.code_files, 1);
        assert_eq!(scan.profile.primary_language, None);
    }

    #[test]
    fn repeated_scans_are_identical() {
        let dir = project();
        let profiler = FileTreeProfiler::default();
        let first = profiler.scan(dir.path());
        let second = profiler.scan(dir.path());
        assert_eq!(first.profile, second.profile);
        assert_eq!(first.files, second.files);
    }
}
