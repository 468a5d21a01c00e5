//! Static tables for test practice detection.

/// File-name globs of test source files.
pub const TEST_FILE_GLOBS: &[&str] = &[
    "test_*.py",
    "*_test.py",
    "tests.py",
    "*_test.go",
    "*_test.rs",
    "*.test.{js,jsx,ts,tsx,mjs}",
    "*.spec.{js,jsx,ts,tsx}",
    "*_spec.rb",
    "*Test.java",
    "*Tests.java",
    "*Test.cs",
    "*Tests.cs",
    "*.test",
    "*.spec",
];

/// Top-level directories that hold tests.
pub const TEST_DIRECTORIES: &[&str] = &["tests", "test", "__tests__", "spec", "specs", "testing"];

/// Framework names with the lowercase keywords that reveal them.
pub const FRAMEWORK_KEYWORDS: &[(&str, &[&str])] = &[
    ("pytest", &["pytest", "py.test"]),
    ("unittest", &["unittest"]),
    ("jest", &["jest"]),
    ("mocha", &["mocha"]),
    ("jasmine", &["jasmine"]),
    ("junit", &["junit"]),
    ("nunit", &["nunit"]),
    ("xunit", &["xunit"]),
    ("vitest", &["vitest"]),
    ("cypress", &["cypress"]),
];

/// Manifest and build files searched for framework keywords.
pub const FRAMEWORK_SOURCE_GLOBS: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "pom.xml",
    "build.gradle",
    "*.csproj",
    "*.sln",
];

/// Patterns counting test functions, matched case-insensitively.
pub const TEST_FUNCTION_PATTERNS: &[&str] = &[
    r"def\s+test_\w+",
    r"class\s+\w*Test\w*",
    r"function\s+test\w*",
    r"const\s+test\w*\s*=",
    r"\bit\s*\(",
    r"\bdescribe\s*\(",
    r"public\s+void\s+test\w*",
    r"@Test\b",
    r"\[Test\]",
];

/// File-name globs of test plans, matched case-insensitively.
pub const TEST_PLAN_GLOBS: &[&str] = &["{test,testing}[_-]{plan,strategy}*.{md,txt,doc}"];

/// Phrases in a top-level README that count as a test plan.
pub const TEST_PLAN_PHRASES: &[&str] = &[
    "test plan",
    "testing plan",
    "test strategy",
    "testing strategy",
];

/// File-name globs of test documentation, matched case-insensitively.
pub const TEST_DOC_GLOBS: &[&str] = &["{test,testing}*.{md,txt,doc,docx,rst,adoc}"];

/// Extensions of documentation files inside test documentation directories.
pub const TEST_DOC_EXTENSIONS: &[&str] = &["md", "txt", "doc", "docx", "rst", "adoc"];

/// Directories whose documentation files count as test documentation.
pub const TEST_DOC_DIRECTORIES: &[&str] = &[
    "docs/test",
    "docs/testing",
    "test/docs",
    "testing/docs",
    "documentation/test",
    "documentation/testing",
];

/// Commit message keywords suggesting test-driven development.
pub const TDD_KEYWORDS: &[&str] = &[
    "tdd",
    "test first",
    "test-first",
    "test driven",
    "test-driven",
    "red green refactor",
    "red-green-refactor",
    "fail first",
    "fail-first",
];

/// Lookup tables of the test signal detector.
#[derive(Debug, Clone, Copy)]
pub struct TestSignalTables {
    /// Test file globs.
    pub test_files: &'static [&'static str],
    /// Test directories.
    pub test_directories: &'static [&'static str],
    /// Framework keywords.
    pub frameworks: &'static [(&'static str, &'static [&'static str])],
    /// Files searched for framework keywords.
    pub framework_sources: &'static [&'static str],
    /// Test function patterns.
    pub test_functions: &'static [&'static str],
    /// Test plan globs.
    pub test_plans: &'static [&'static str],
    /// README phrases announcing a test plan.
    pub test_plan_phrases: &'static [&'static str],
    /// Test documentation globs.
    pub test_docs: &'static [&'static str],
    /// Extensions accepted inside test documentation directories.
    pub test_doc_extensions: &'static [&'static str],
    /// Test documentation directories.
    pub test_doc_directories: &'static [&'static str],
    /// TDD keywords.
    pub tdd_keywords: &'static [&'static str],
}

impl Default for TestSignalTables {
    fn default() -> Self {
        Self {
            test_files: TEST_FILE_GLOBS,
            test_directories: TEST_DIRECTORIES,
            frameworks: FRAMEWORK_KEYWORDS,
            framework_sources: FRAMEWORK_SOURCE_GLOBS,
            test_functions: TEST_FUNCTION_PATTERNS,
            test_plans: TEST_PLAN_GLOBS,
            test_plan_phrases: TEST_PLAN_PHRASES,
            test_docs: TEST_DOC_GLOBS,
            test_doc_extensions: TEST_DOC_EXTENSIONS,
            test_doc_directories: TEST_DOC_DIRECTORIES,
            tdd_keywords: TDD_KEYWORDS,
        }
    }
}
