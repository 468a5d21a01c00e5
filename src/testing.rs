//! Test practice detection.

pub mod tables;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::git::CommitRecord;
use crate::profile::tables::is_readme;
use crate::profile::tree::NO_EXTENSION;
use crate::profile::{FileCategory, ScannedFile, TreeScan};

pub use tables::TestSignalTables;

/// Number of recent commits inspected for TDD keywords by default.
pub const DEFAULT_TDD_WINDOW: usize = 20;

/// Share of recent commits that must mention TDD, as `numerator / denominator`.
const TDD_COMMIT_SHARE: (usize, usize) = (1, 5);

/// Band of test-to-implementation file ratios read as test-first work.
const TDD_RATIO_BAND: std::ops::RangeInclusive<f64> = 0.1..=1.0;

/// A detector table entry failed to compile.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Invalid glob.
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    /// Invalid regular expression.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Testing practice signals of one repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestProfile {
    /// Test files or a test directory exist.
    pub has_unit_tests: bool,
    /// A test plan document or README section exists.
    pub has_test_plan: bool,
    /// Test documentation exists.
    pub has_test_documentation: bool,
    /// Commit history or file ratios suggest test-driven development.
    pub uses_tdd: bool,
    /// Test files per code file as a percentage, capped at 100.
    pub coverage_estimate: f64,
    /// Detected frameworks, sorted.
    pub frameworks: Vec<String>,
    /// Test file paths in walk order.
    pub test_files: Vec<String>,
    /// Number of test files.
    pub test_file_count: usize,
    /// Top-level test directories found.
    pub test_directories: Vec<String>,
    /// Test functions counted across test files.
    pub test_function_count: usize,
    /// Test files per extension key.
    pub test_file_types: BTreeMap<String, usize>,
    /// Test documentation paths, sorted.
    pub test_documentation_files: Vec<String>,
}

/// Detects testing practice from a scanned tree and recent commits.
#[derive(Debug, Clone)]
pub struct TestSignalDetector {
    test_files: GlobSet,
    framework_sources: GlobSet,
    test_plans: GlobSet,
    test_docs: GlobSet,
    test_functions: Vec<Regex>,
    tables: TestSignalTables,
    tdd_window: usize,
}

impl TestSignalDetector {
    /// Compiles the detector tables.
    pub fn new(tables: TestSignalTables) -> Result<Self, PatternError> {
        let test_functions = tables
            .test_functions
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            test_files: glob_set(tables.test_files, false)?,
            framework_sources: glob_set(tables.framework_sources, false)?,
            test_plans: glob_set(tables.test_plans, true)?,
            test_docs: glob_set(tables.test_docs, true)?,
            test_functions,
            tables,
            tdd_window: DEFAULT_TDD_WINDOW,
        })
    }

    /// Compiles the default tables.
    pub fn with_defaults() -> Result<Self, PatternError> {
        Self::new(TestSignalTables::default())
    }

    /// Sets how many recent commits are checked for TDD keywords.
    #[must_use]
    pub fn with_tdd_window(mut self, window: usize) -> Self {
        self.tdd_window = window;
        self
    }

    /// Returns true if the file name is a test file name.
    pub fn is_test_file(&self, file_name: &str) -> bool {
        self.test_files.is_match(file_name)
    }

    /// Detects test signals.
    ///
    /// `commits` must be ordered most recent first. Files that cannot be read
    /// contribute no keywords and no test functions.
    pub fn detect(&self, root: &Path, scan: &TreeScan, commits: &[CommitRecord]) -> TestProfile {
        let test_files: Vec<&ScannedFile> = scan
            .files
            .iter()
            .filter(|f| self.is_test_file(&f.name()))
            .collect();

        let test_directories: Vec<String> = self
            .tables
            .test_directories
            .iter()
            .filter(|d| root.join(d).is_dir())
            .map(|d| (*d).to_string())
            .collect();

        let mut test_file_types = BTreeMap::new();
        let mut test_function_count = 0;
        let mut frameworks = BTreeSet::new();
        for file in &test_files {
            let key = file.extension.as_deref().unwrap_or(NO_EXTENSION);
            *test_file_types.entry(key.to_string()).or_insert(0) += 1;

            if let Some(content) = read_lowercase(root, file) {
                test_function_count += self
                    .test_functions
                    .iter()
                    .map(|re| re.find_iter(&content).count())
                    .sum::<usize>();
                self.collect_frameworks(&content, &mut frameworks);
            }
        }

        for source in scan
            .files
            .iter()
            .filter(|f| self.framework_sources.is_match(f.name()))
        {
            if let Some(content) = read_lowercase(root, source) {
                self.collect_frameworks(&content, &mut frameworks);
            }
        }

        let test_documentation_files = self.test_documentation(scan);
        let code_files = scan.profile.code_files;

        TestProfile {
            has_unit_tests: !test_files.is_empty() || !test_directories.is_empty(),
            has_test_plan: self.has_test_plan(root, scan),
            has_test_documentation: !test_documentation_files.is_empty(),
            uses_tdd: self.uses_tdd(scan, test_files.len(), commits),
            coverage_estimate: coverage_estimate(test_files.len(), code_files),
            frameworks: frameworks.into_iter().collect(),
            test_files: test_files.iter().map(|f| f.display_path()).collect(),
            test_file_count: test_files.len(),
            test_directories,
            test_function_count,
            test_file_types,
            test_documentation_files,
        }
    }

    fn collect_frameworks(&self, content: &str, found: &mut BTreeSet<String>) {
        for (framework, keywords) in self.tables.frameworks {
            if keywords.iter().any(|k| content.contains(k)) {
                found.insert((*framework).to_string());
            }
        }
    }

    fn has_test_plan(&self, root: &Path, scan: &TreeScan) -> bool {
        if scan.files.iter().any(|f| self.test_plans.is_match(f.name())) {
            return true;
        }

        scan.files
            .iter()
            .filter(|f| f.is_top_level() && is_readme(&f.name()))
            .filter_map(|f| read_lowercase(root, f))
            .any(|content| {
                self.tables
                    .test_plan_phrases
                    .iter()
                    .any(|phrase| content.contains(phrase))
            })
    }

    fn test_documentation(&self, scan: &TreeScan) -> Vec<String> {
        let mut docs = BTreeSet::new();
        for file in &scan.files {
            let named_as_doc = file.category != FileCategory::Code && self.test_docs.is_match(file.name());
            let in_doc_dir = self
                .tables
                .test_doc_directories
                .iter()
                .any(|d| file.relative.starts_with(d))
                && file
                    .extension
                    .as_deref()
                    .is_some_and(|ext| self.tables.test_doc_extensions.contains(&ext));

            if named_as_doc || in_doc_dir {
                docs.insert(file.display_path());
            }
        }
        docs.into_iter().collect()
    }

    fn uses_tdd(&self, scan: &TreeScan, test_file_count: usize, commits: &[CommitRecord]) -> bool {
        let window: Vec<_> = commits.iter().take(self.tdd_window).collect();
        let tdd_commits = window
            .iter()
            .filter(|c| {
                let subject = c.subject().to_lowercase();
                self.tables.tdd_keywords.iter().any(|k| subject.contains(k))
            })
            .count();
        let (num, den) = TDD_COMMIT_SHARE;
        if !window.is_empty() && tdd_commits * den >= window.len() * num {
            debug!(tdd_commits, window = window.len(), "TDD keywords in commit history");
            return true;
        }

        let implementation_files = scan
            .files
            .iter()
            .filter(|f| f.category == FileCategory::Code && !self.is_test_file(&f.name()))
            .count();
        if implementation_files == 0 {
            return false;
        }
        let ratio = test_file_count as f64 / implementation_files as f64;
        TDD_RATIO_BAND.contains(&ratio)
    }
}

/// `min(test_files / code_files, 1) * 100`, two decimals, 0 without code.
pub fn coverage_estimate(test_files: usize, code_files: usize) -> f64 {
    if code_files == 0 {
        return 0.0;
    }
    let ratio = (test_files as f64 / code_files as f64).min(1.0);
    (ratio * 100.0 * 100.0).round() / 100.0
}

fn glob_set(patterns: &[&str], case_insensitive: bool) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .literal_separator(true)
                .build()?,
        );
    }
    builder.build()
}

fn read_lowercase(root: &Path, file: &ScannedFile) -> Option<String> {
    match fs::read(root.join(&file.relative)) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).to_lowercase()),
        Err(e) => {
            debug!(path = %file.relative.display(), error = %e, "skipping unreadable file");
            None
        }
    }
}
