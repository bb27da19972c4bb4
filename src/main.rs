//! konmari - find the clutter a repository no longer needs.
//!
//! Usage:
//!   konmari [PATH]                  Analyze and print a text summary
//!   konmari [PATH] --format json    Print the full report as JSON
//!   konmari --help                  Show help

use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use konmari_analyze::{Engine, format_age};
use konmari_core::{
    AnalysisConfig, AnalysisOutcome, AnalysisReport, CategoryReport, ConfidenceBand, ContextAdvice,
    PassStatus,
};

#[derive(Parser)]
#[command(
    name = "konmari",
    version,
    about = "Heuristic repository decluttering analyzer",
    long_about = "konmari walks a repository and reports what it probably no longer needs: \
                  stale and duplicate files, unused dependencies, broken documentation \
                  links, orphaned tool configuration and legacy markers.\n\n\
                  Every finding carries a confidence score. Nothing is ever deleted."
)]
struct Cli {
    /// Repository to analyze (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of files kept when sampling a large repository
    #[arg(long)]
    max_files: Option<usize>,

    /// File count above which the repository is sampled
    #[arg(long)]
    large_repo_threshold: Option<usize>,

    /// Days of git history to inspect
    #[arg(long)]
    window_days: Option<u32>,

    /// Skip git history analysis
    #[arg(long)]
    no_git: bool,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let engine = Engine::new(config).context("Invalid configuration")?;
    debug!(path = %cli.path.display(), format = ?cli.format, "analyzing");

    let result = match cli.timeout {
        Some(secs) => engine.analyze_until(&cli.path, Instant::now() + Duration::from_secs(secs)),
        None => engine.analyze(&cli.path),
    };
    let outcome = AnalysisOutcome::from(result);

    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&outcome)?,
        OutputFormat::Text => render_text(&outcome)?,
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if outcome.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the configuration file, then apply command-line overrides.
fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(cap) = cli.max_files {
        config.walk.sample_cap = cap;
    }
    if let Some(threshold) = cli.large_repo_threshold {
        config.walk.large_repo_threshold = threshold;
    }
    if let Some(days) = cli.window_days {
        config.git.window_days = days;
    }
    if cli.no_git {
        config.git.enabled = false;
    }
    Ok(config)
}

fn status_label(status: &PassStatus) -> String {
    match status {
        PassStatus::Complete => "complete".to_string(),
        PassStatus::Partial { reason } => format!("partial: {reason}"),
        PassStatus::Skipped { reason } => format!("skipped: {reason}"),
    }
}

fn render_text(outcome: &AnalysisOutcome) -> Result<String, fmt::Error> {
    let mut out = String::new();
    match outcome {
        AnalysisOutcome::Report(report) => render_report(&mut out, report)?,
        AnalysisOutcome::Failed { error } => write!(out, "error: {}", error.message)?,
    }
    Ok(out)
}

fn render_report(out: &mut String, report: &AnalysisReport) -> fmt::Result {
    let rule = "─".repeat(60);

    writeln!(out, "{rule}")?;
    writeln!(out, " {}", report.repo_path.display())?;
    write!(out, " {} files", report.file_count)?;
    if report.sampled {
        write!(out, " (sampled from {})", report.discovered_file_count)?;
    }
    let ecosystems: Vec<String> = report.ecosystems.ecosystems().iter().map(|e| e.to_string()).collect();
    if !ecosystems.is_empty() {
        write!(out, ", {}", ecosystems.join(", "))?;
    }
    if report.monorepo.is_monorepo {
        write!(out, ", monorepo")?;
    }
    writeln!(out)?;
    writeln!(out, "{rule}")?;

    for category in report.categories.iter() {
        render_category(out, category)?;
    }
    render_context_heavy(out, report)?;
    render_git(out, report)?;

    writeln!(out)?;
    writeln!(out, "{rule}")?;
    let verdict = &report.cleanliness;
    let headline = if verdict.is_clean {
        "Clean: nothing to tidy".to_string()
    } else if verdict.nearly_clean {
        format!("Nearly clean: {} issues", verdict.issues_count)
    } else {
        format!("{} issues", verdict.issues_count)
    };
    writeln!(
        out,
        " {headline} ({} quick wins, {} decisions)",
        report.summary.quick_wins.len(),
        report.summary.decisions_needed.len()
    )?;
    if !report.diagnostics.is_empty() {
        writeln!(out, " {} diagnostic(s) during analysis", report.diagnostics.len())?;
    }
    write!(out, "{rule}")
}

fn render_category(out: &mut String, category: &CategoryReport) -> fmt::Result {
    writeln!(out)?;
    write!(out, " {} ({})", category.name, category.count)?;
    if !category.status.is_complete() {
        write!(out, " [{}]", status_label(&category.status))?;
    }
    writeln!(out)?;

    for (band, label) in [
        (ConfidenceBand::QuickWin, "Quick wins"),
        (ConfidenceBand::DecisionNeeded, "Decisions needed"),
        (ConfidenceBand::Contemplate, "Contemplate"),
    ] {
        let items: Vec<_> = category.items.iter().filter(|f| f.band() == band).collect();
        if items.is_empty() {
            continue;
        }
        writeln!(out, "   {label}:")?;
        for finding in items {
            writeln!(out, "     {:>3}  {}", finding.confidence.value(), finding.target)?;
            writeln!(out, "          {}", finding.reason)?;
        }
    }
    Ok(())
}

fn render_context_heavy(out: &mut String, report: &AnalysisReport) -> fmt::Result {
    if report.context_heavy_files.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, " Context-heavy documents ({})", report.summary.context_heavy_count)?;
    for file in &report.context_heavy_files {
        let advice = match file.recommendation {
            ContextAdvice::ConsiderSplitting => "consider splitting",
            ContextAdvice::Monitor => "monitor",
        };
        writeln!(
            out,
            "   {}  {} lines, ~{} tokens, {advice}",
            file.path, file.lines, file.estimated_tokens
        )?;
    }
    Ok(())
}

fn render_git(out: &mut String, report: &AnalysisReport) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, " Git history ({})", status_label(&report.archaeology_status))?;
    let Some(git) = &report.git_archaeology else {
        return writeln!(out, "   not analyzed");
    };

    writeln!(
        out,
        "   {} of {} commits in the last {} days carry automation signatures ({:.0}%)",
        git.ai_commit_count,
        git.total_commits,
        git.window_days,
        git.ai_commit_ratio * 100.0
    )?;
    if git.style_flagged_commit_count > 0 {
        writeln!(
            out,
            "   {} more read like generated commit messages",
            git.style_flagged_commit_count
        )?;
    }
    for branch in &git.stale_branches {
        let age = branch
            .last_commit_age_days
            .map(|d| format!(", last commit {} ago", format_age(d.max(0) as u64)))
            .unwrap_or_default();
        writeln!(out, "   branch {}{age}", branch.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use konmari_core::{ErrorKind, ErrorReport};

    use super::*;

    #[test]
    fn test_render_failed_outcome() {
        let outcome = AnalysisOutcome::Failed {
            error: ErrorReport {
                kind: ErrorKind::InvalidRoot,
                message: "Invalid root /nope".to_string(),
            },
        };
        assert_eq!(render_text(&outcome).unwrap(), "error: Invalid root /nope");
    }

    #[test]
    fn test_render_report_sections() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("notes_backup.md"), "# old\n").unwrap();
        std::fs::write(temp.path().join("HANDBOOK.md"), "guidance\n".repeat(1_200)).unwrap();

        let engine = Engine::new(AnalysisConfig::default()).unwrap();
        let outcome = engine.outcome(temp.path());
        let text = render_text(&outcome).unwrap();

        assert!(text.contains("Dead Files"));
        assert!(text.contains("Context-heavy documents (1)"));
        assert!(text.contains("HANDBOOK.md  1201 lines"));
        assert!(text.contains("Git history (skipped: "));
    }
}
