//! Working tree structure profiling.

pub mod stack;
pub mod tables;
pub mod tree;

pub use stack::detect_stack;
pub use tables::{ClassificationTables, FileCategory, Language, StackRule};
pub use tree::{FileTreeProfile, FileTreeProfiler, ScannedFile, TreeScan};
