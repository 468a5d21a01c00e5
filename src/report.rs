//! Rendering of records, rankings and batch summaries.

use std::cmp::Ordering;
use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::git::RepositoryIdentity;
use crate::issues::IssueQuality;
use crate::pipeline::{BatchSummary, RepositoryOutcome};
use crate::quality::RepositoryRecord;
use crate::store::UpsertOutcome;
use crate::workflow::WorkflowStyle;

/// Output format of the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text format.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(format!("unknown output format '{other}' (expected text, json or yaml)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Orders records for the ranking.
///
/// Quality, then workflow, then issue score, all descending; ties are broken
/// by identity so the order is stable across runs.
pub fn ranking_order(a: &RepositoryRecord, b: &RepositoryRecord) -> Ordering {
    b.quality
        .score
        .cmp(&a.quality.score)
        .then_with(|| b.workflow.score.cmp(&a.workflow.score))
        .then_with(|| b.issues.score.cmp(&a.issues.score))
        .then_with(|| a.identity.cmp(&b.identity))
}

/// One line of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRepository {
    /// 1-based position.
    pub rank: usize,
    /// Repository identity.
    pub identity: RepositoryIdentity,
    /// Quality score.
    pub quality: u32,
    /// Workflow score.
    pub workflow: u32,
    /// Workflow style.
    pub workflow_style: WorkflowStyle,
    /// Issue-driven score.
    pub issues: u32,
    /// Issue quality label.
    pub issue_quality: IssueQuality,
    /// Estimated test coverage.
    pub coverage_estimate: f64,
    /// Record carries warnings.
    pub degraded: bool,
}

/// Sorts records into the ranking.
pub fn rank(mut records: Vec<RepositoryRecord>) -> Vec<RankedRepository> {
    records.sort_by(ranking_order);
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| RankedRepository {
            rank: i + 1,
            degraded: r.is_degraded(),
            identity: r.identity,
            quality: r.quality.score,
            workflow: r.workflow.score,
            workflow_style: r.workflow.style,
            issues: r.issues.score,
            issue_quality: r.issues.quality,
            coverage_estimate: r.testing.coverage_estimate,
        })
        .collect()
}

fn structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Text => Ok(None),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(Some)
            .context("Failed to serialize output to JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map(Some)
            .context("Failed to serialize output to YAML"),
    }
}

fn check_mark(passed: bool) -> &'static str {
    if passed {
        "yes"
    } else {
        "no"
    }
}

/// Renders a single repository record.
pub fn render_record(record: &RepositoryRecord, format: OutputFormat) -> Result<String> {
    if let Some(out) = structured(record, format)? {
        return Ok(out);
    }

    let mut out = String::new();
    let s = &record.structure;
    let a = &record.activity;
    let w = &record.workflow;
    let i = &record.issues;
    let t = &record.testing;
    let q = &record.quality;

    out.push_str(&format!("{} ({})\n", record.identity, record.path));
    if let Some(url) = &record.remote_url {
        out.push_str(&format!("  remote:    {url}\n"));
    }
    out.push_str(&format!(
        "  structure: {} files ({} code, {} docs, {} config, {} other), {} dirs, {:.1} KB\n",
        s.total_files, s.code_files, s.doc_files, s.config_files, s.other_files, s.directories, s.size_kb
    ));
    if let Some(language) = &s.primary_language {
        let counts: Vec<String> = s
            .languages
            .iter()
            .map(|(language, files)| format!("{language} {files}"))
            .collect();
        out.push_str(&format!("  language:  {language} ({})\n", counts.join(", ")));
    }
    if !s.tech_stack.is_empty() {
        out.push_str(&format!("  stack:     {}\n", s.tech_stack.join(", ")));
    }
    out.push_str(&format!(
        "  activity:  {} commits by {} contributors on {}\n",
        a.total_commits,
        a.contributors,
        a.current_branch.as_deref().unwrap_or("(detached)")
    ));
    if let Some(last) = &a.last_commit {
        out.push_str(&format!("  last:      {last}\n"));
    }
    out.push_str(&format!(
        "  workflow:  {}/100 {} ({} branches, {} feature, {} hotfix, {} merges, main: {})\n",
        w.score, w.style, w.total_branches, w.feature_branches, w.hotfix_branches, w.merge_commits, w.main_branch
    ));
    if !w.practices.is_empty() {
        out.push_str(&format!("             {}\n", w.practices.join(", ")));
    }
    out.push_str(&format!(
        "  issues:    {}/100 {} ({:.1}% commits reference issues, {} issues, {} closed)\n",
        i.score, i.quality, i.commit_issue_ratio, i.total_issues, i.closed_issues
    ));
    out.push_str(&format!(
        "  testing:   coverage {:.2}%, {} test files, {} test functions, TDD: {}\n",
        t.coverage_estimate,
        t.test_file_count,
        t.test_function_count,
        check_mark(t.uses_tdd)
    ));
    if !t.frameworks.is_empty() {
        out.push_str(&format!("             frameworks: {}\n", t.frameworks.join(", ")));
    }
    let checks: Vec<String> = q
        .breakdown()
        .iter()
        .map(|(name, passed)| format!("{name}: {}", check_mark(*passed)))
        .collect();
    out.push_str(&format!("  quality:   {}/100 ({})\n", q.score, checks.join(", ")));

    if record.is_degraded() {
        out.push_str("  warnings:\n");
        for warning in &record.warnings {
            out.push_str(&format!("    - {}: {}\n", warning.stage, warning.message));
        }
    }
    Ok(out)
}

/// Renders the ranking of stored records.
pub fn render_ranking(ranking: &[RankedRepository], format: OutputFormat) -> Result<String> {
    if let Some(out) = structured(&ranking, format)? {
        return Ok(out);
    }
    if ranking.is_empty() {
        return Ok("No records stored.\n".to_string());
    }

    let width = ranking
        .iter()
        .map(|r| r.identity.to_string().len())
        .max()
        .unwrap_or(0)
        .max("REPOSITORY".len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:>4}  {:<width$}  {:>7}  {:>8}  {:>6}  {:>8}\n",
        "RANK", "REPOSITORY", "QUALITY", "WORKFLOW", "ISSUES", "COVERAGE"
    ));
    for r in ranking {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>7}  {:>8}  {:>6}  {:>7.2}%{}\n",
            r.rank,
            r.identity.to_string(),
            r.quality,
            r.workflow,
            r.issues,
            r.coverage_estimate,
            if r.degraded { "  (degraded)" } else { "" }
        ));
    }
    Ok(out)
}

/// Renders the tallies and per-repository outcomes of a batch.
pub fn render_summary(summary: &BatchSummary, format: OutputFormat) -> Result<String> {
    if let Some(out) = structured(summary, format)? {
        return Ok(out);
    }

    let mut out = String::new();
    for outcome in &summary.outcomes {
        let line = match outcome {
            RepositoryOutcome::Persisted {
                identity,
                outcome,
                degraded,
                ..
            } => {
                let verb = match outcome {
                    UpsertOutcome::Created => "created",
                    UpsertOutcome::Replaced => "updated",
                };
                let note = if *degraded { " (degraded)" } else { "" };
                format!("  ok      {identity}: {verb}{note}")
            }
            RepositoryOutcome::PersistFailed {
                identity, error, ..
            } => format!("  unsaved {identity}: {error}"),
            RepositoryOutcome::Failed { path, error } => {
                format!("  failed  {}: {error}", path.display())
            }
        };
        out.push_str(&format!("{line}\n"));
    }
    out.push_str(&format!(
        "{} repositories: {} analyzed, {} degraded, {} failed, {} persisted\n",
        summary.total, summary.analyzed, summary.degraded, summary.failed, summary.persisted
    ));
    Ok(out)
}
