// premerge/src/commands/merge.rs
//
// USE CASE: Clean + enrich the tables into Parquet.

use std::path::PathBuf;

use anyhow::Context;
use premerge_core::application::{MergeOptions, run_merge};

pub async fn execute(project_dir: PathBuf, nrows: Option<usize>, force: bool) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    println!("🔗 Merging project in {}...", project_dir.display());
    if force {
        println!("   ⚠️  --force: ignoring blocking profile failures");
    }

    let run = run_merge(&project_dir, MergeOptions { row_limit: nrows, force })
        .await
        .with_context(|| format!("Merge failed for project {:?}", project_dir))?;

    let summary = &run.summary;
    println!("📂 Data root: {}", run.data_root.display());
    for (table, dropped) in &summary.duplicates_dropped {
        println!("   🧹 {}: dropped {} duplicate key-row(s)", table, dropped);
    }
    println!(
        "   🌍 Dropped {} row(s) outside the bounding box, cleared {} speed value(s)",
        summary.out_of_bounds_dropped, summary.speeds_cleared
    );
    for (rule, mismatches) in &summary.parity_mismatches {
        println!("   🔢 {} parity mismatches: {}", rule, mismatches);
    }

    println!("\n💾 Outputs:");
    for output in &summary.outputs {
        println!(
            "   {} ({} rows x {} columns)",
            output.path.display(),
            output.rows,
            output.columns
        );
    }

    println!("\n✨ Merge finished in {:.2?}", start.elapsed());
    Ok(())
}
