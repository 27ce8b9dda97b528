use anyhow::Result;

use vb_career::{cli, stats_merge};

fn main() -> Result<()> {
    let cfg = cli::bootstrap()?;
    let report = stats_merge::run(&cfg)?;

    println!("Stats merged");
    for (season, path, rows) in &report.season_files {
        println!("season {season}: {rows} matches -> {}", path.display());
    }
    println!(
        "All stats: {} rows ({} placeholders, {} dnp) -> {}",
        report.total_rows,
        report.placeholders,
        report.dnp,
        report.all_path.display()
    );
    if !report.diagnostics.is_empty() {
        println!("  diagnostics: {}", report.diagnostics.len());
        for d in report.diagnostics.iter().take(6) {
            println!("   - {d}");
        }
    }
    Ok(())
}
