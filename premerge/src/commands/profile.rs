// premerge/src/commands/profile.rs
//
// USE CASE: Profile the raw tables before any merge.

use std::path::PathBuf;

use anyhow::Context;
use premerge_core::application::{ProfileOptions, run_profile};
use premerge_core::domain::report::CheckStatus;

pub async fn execute(
    project_dir: PathBuf,
    nrows: Option<usize>,
    emit_samples: bool,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    println!("🔎 Profiling project in {}...", project_dir.display());
    if let Some(n) = nrows {
        println!("   Row cap: {} rows per file", n);
    }

    let options = ProfileOptions {
        row_limit: nrows,
        emit_samples,
    };
    let run = run_profile(&project_dir, options)
        .await
        .with_context(|| format!("Profiling failed for project {:?}", project_dir))?;

    let report = &run.bundle.report;
    println!("📂 Data root: {}", run.data_root.display());
    for table in &report.tables {
        let capped = if table.truncated { " (truncated)" } else { "" };
        println!(
            "   📄 {}: {} rows x {} columns{}",
            table.name, table.row_count, table.column_count, capped
        );
    }

    println!("\n🧪 Checks:");
    for (name, check) in &report.checks {
        let icon = match check.status {
            CheckStatus::Pass => "✅",
            CheckStatus::Fail => "❌",
        };
        println!("   {} {} - {}", icon, name, check.outcome.headline());
    }

    println!("\n📝 Reports:");
    for file in &run.bundle.files {
        println!("   {}", file.display());
    }

    // Findings are report content, never a failed run
    if report.should_block_merge() {
        println!(
            "\n⚠️  {} blocking check(s) failed: 'premerge merge' will refuse to run without --force.",
            report.summary.blocking_failures.len()
        );
    } else if report.has_failures() {
        println!(
            "\n⚠️  {} of {} checks failed. See the report for details.",
            report.summary.checks_failed, report.summary.checks_total
        );
    } else {
        println!("\n✨ All {} checks passed.", report.summary.checks_total);
    }
    println!("   Finished in {:.2?}", start.elapsed());

    Ok(())
}
