//! Static file classification tables.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Languages recognised when picking a primary language.
///
/// Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Python.
    Python,
    /// JavaScript.
    JavaScript,
    /// TypeScript.
    TypeScript,
    /// Java.
    Java,
    /// C and C++ sources and headers.
    #[serde(rename = "C/C++")]
    CCpp,
    /// C#.
    #[serde(rename = "C#")]
    CSharp,
    /// Go.
    Go,
    /// Rust.
    Rust,
    /// Plain HTML and CSS.
    Web,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Java => "Java",
            Self::CCpp => "C/C++",
            Self::CSharp => "C#",
            Self::Go => "Go",
            Self::Rust => "Rust",
            Self::Web => "Web",
        };
        f.write_str(name)
    }
}

/// Extensions counted as source code.
pub const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "vue", "java", "cpp", "c", "h", "hpp", "cs", "php", "rb",
    "go", "rs", "swift", "kt", "scala", "html", "css", "scss", "sass", "less",
];

/// Extensions counted as documentation.
pub const DOC_EXTENSIONS: &[&str] = &["md", "txt", "rst", "doc", "docx", "pdf", "tex", "adoc"];

/// Extensions counted as configuration.
pub const CONFIG_EXTENSIONS: &[&str] = &[
    "json",
    "yaml",
    "yml",
    "toml",
    "ini",
    "cfg",
    "conf",
    "env",
    "xml",
    "gitignore",
    "dockerignore",
    "editorconfig",
];

/// Language to extension mapping, in tie-break order.
pub const LANGUAGE_EXTENSIONS: &[(Language, &[&str])] = &[
    (Language::Python, &["py"]),
    (Language::JavaScript, &["js", "jsx"]),
    (Language::TypeScript, &["ts", "tsx"]),
    (Language::Java, &["java"]),
    (Language::CCpp, &["cpp", "c", "h", "hpp"]),
    (Language::CSharp, &["cs"]),
    (Language::Go, &["go"]),
    (Language::Rust, &["rs"]),
    (Language::Web, &["html", "css"]),
];

/// File names that declare dependencies.
pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "setup.py",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "Gemfile",
    "composer.json",
];

/// File names that define a container build, compared case-insensitively.
pub const CONTAINER_FILES: &[&str] = &[
    "dockerfile",
    "containerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// How a framework or platform shows up in a project's files.
///
/// Keywords are lowercase substrings. A rule matches when any of its
/// keywords occurs in the corresponding source, or any marker file exists.
#[derive(Debug, Clone, Copy)]
pub struct StackRule {
    /// Name reported in the tech stack.
    pub name: &'static str,
    /// Matched against `package.json` dependency names.
    pub npm: &'static [&'static str],
    /// Matched against Python requirement files.
    pub python: &'static [&'static str],
    /// Matched against Maven and Gradle build files.
    pub jvm: &'static [&'static str],
    /// File names anywhere in the tree.
    pub markers: &'static [&'static str],
}

const fn rule(name: &'static str) -> StackRule {
    StackRule {
        name,
        npm: &[],
        python: &[],
        jvm: &[],
        markers: &[],
    }
}

/// Frameworks, libraries and platforms recognised in a tech stack.
pub const STACK_RULES: &[StackRule] = &[
    StackRule { python: &["django"], markers: &["manage.py"], ..rule("Django") },
    StackRule { python: &["flask"], ..rule("Flask") },
    StackRule { python: &["fastapi"], ..rule("FastAPI") },
    StackRule { python: &["torch"], ..rule("PyTorch") },
    StackRule { python: &["tensorflow"], ..rule("TensorFlow") },
    StackRule { python: &["scikit-learn", "sklearn"], ..rule("Scikit-learn") },
    StackRule { python: &["pandas"], ..rule("Pandas") },
    StackRule { python: &["numpy"], ..rule("NumPy") },
    StackRule { python: &["transformers"], ..rule("Transformers") },
    StackRule { python: &["openai"], npm: &["openai"], ..rule("OpenAI") },
    StackRule { python: &["anthropic"], npm: &["@anthropic-ai/sdk"], ..rule("Anthropic") },
    StackRule { python: &["langchain"], npm: &["langchain"], ..rule("LangChain") },
    StackRule { npm: &["react"], ..rule("React") },
    StackRule { npm: &["vue"], ..rule("Vue.js") },
    StackRule { npm: &["@angular/core"], ..rule("Angular") },
    StackRule { npm: &["express"], ..rule("Express") },
    StackRule { npm: &["next"], markers: &["next.config.js", "next.config.mjs"], ..rule("Next.js") },
    StackRule { npm: &["vite"], markers: &["vite.config.js", "vite.config.ts"], ..rule("Vite") },
    StackRule { npm: &["webpack"], markers: &["webpack.config.js"], ..rule("Webpack") },
    StackRule { markers: &["package.json"], ..rule("Node.js") },
    StackRule { jvm: &["spring-boot"], ..rule("Spring Boot") },
    StackRule { markers: &["pom.xml"], ..rule("Maven") },
    StackRule { markers: &["build.gradle", "build.gradle.kts"], ..rule("Gradle") },
    StackRule { python: &["psycopg", "asyncpg"], npm: &["postgres"], ..rule("PostgreSQL") },
    StackRule { python: &["pymysql", "mysql-connector"], npm: &["mysql"], ..rule("MySQL") },
    StackRule { python: &["pymongo", "motor"], npm: &["mongodb", "mongoose"], ..rule("MongoDB") },
    StackRule { python: &["redis"], npm: &["redis"], ..rule("Redis") },
    StackRule {
        markers: &["Dockerfile", "docker-compose.yml", "docker-compose.yaml"],
        ..rule("Docker")
    },
];

/// Top-level Python files holding requirements.
pub const PYTHON_REQUIREMENT_FILES: &[&str] =
    &["requirements.txt", "requirements-dev.txt", "pyproject.toml", "Pipfile"];

/// Top-level JVM build files.
pub const JVM_BUILD_FILES: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts"];

/// npm manifest whose dependency names are matched.
pub const NPM_MANIFEST: &str = "package.json";

/// Category of a file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// Source code.
    Code,
    /// Documentation.
    Doc,
    /// Configuration.
    Config,
    /// Anything else.
    Other,
}

/// Lookup tables used by the tree profiler and the test detector.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationTables {
    /// Code extensions.
    pub code: &'static [&'static str],
    /// Documentation extensions.
    pub doc: &'static [&'static str],
    /// Configuration extensions.
    pub config: &'static [&'static str],
    /// Language mapping in tie-break order.
    pub languages: &'static [(Language, &'static [&'static str])],
    /// Dependency manifest file names.
    pub manifests: &'static [&'static str],
    /// Container definition file names, lowercase.
    pub containers: &'static [&'static str],
    /// Tech stack rules.
    pub stack: &'static [StackRule],
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self {
            code: CODE_EXTENSIONS,
            doc: DOC_EXTENSIONS,
            config: CONFIG_EXTENSIONS,
            languages: LANGUAGE_EXTENSIONS,
            manifests: MANIFEST_FILES,
            containers: CONTAINER_FILES,
            stack: STACK_RULES,
        }
    }
}

impl ClassificationTables {
    /// Classifies an extension key; code wins over doc over config.
    pub fn categorize(&self, extension: Option<&str>) -> FileCategory {
        let Some(ext) = extension else {
            return FileCategory::Other;
        };
        if self.code.contains(&ext) {
            FileCategory::Code
        } else if self.doc.contains(&ext) {
            FileCategory::Doc
        } else if self.config.contains(&ext) {
            FileCategory::Config
        } else {
            FileCategory::Other
        }
    }

    /// Returns the language an extension maps to.
    pub fn language_of(&self, extension: &str) -> Option<Language> {
        self.languages
            .iter()
            .find(|(_, exts)| exts.contains(&extension))
            .map(|(language, _)| *language)
    }

    /// Returns true for dependency manifests.
    pub fn is_manifest(&self, file_name: &str) -> bool {
        self.manifests.contains(&file_name)
    }

    /// Returns true for container definitions.
    pub fn is_container(&self, file_name: &str) -> bool {
        self.containers.contains(&file_name.to_lowercase().as_str())
    }
}

/// Returns true for README files in any casing and extension.
pub fn is_readme(file_name: &str) -> bool {
    file_name.to_lowercase().starts_with("readme")
}

/// Computes the lowercase extension key of a path.
///
/// Extension-less dotfiles use their name without the dot, so `.gitignore`
/// maps to `gitignore`.
pub fn extension_key(path: &Path) -> Option<String> {
    if let Some(ext) = path.extension() {
        return Some(ext.to_string_lossy().to_lowercase());
    }

    let name = path.file_name()?.to_string_lossy();
    name.strip_prefix('.')
        .filter(|rest| !rest.is_empty())
        .map(str::to_lowercase)
}
