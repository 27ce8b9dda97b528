use anyhow::Result;

use vb_career::{cli, pipeline, summary};

fn main() -> Result<()> {
    let cfg = cli::bootstrap()?;
    let report = pipeline::run(&cfg)?;

    println!("Pipeline complete");
    println!("Data: {}", cfg.data_dir.display());
    println!("Schedule rows: {}", report.schedule.rows);
    println!(
        "Stat rows: {} ({} placeholders, {} dnp)",
        report.stats.total_rows, report.stats.placeholders, report.stats.dnp
    );
    println!("Merged rows: {}", report.merge.rows);
    println!("Enriched rows: {}", report.enriched_rows);
    for s in &report.summaries {
        println!("  {}", summary::describe(s));
    }
    println!(
        "Workbook: {} seasons, {} matches",
        report.export.seasons, report.export.matches
    );
    println!("Archive run: {} sha256={}", report.archive.run_id, report.archive.enriched_sha256);

    let diagnostics = report.diagnostics();
    if !diagnostics.is_empty() {
        println!("  diagnostics: {}", diagnostics.len());
        for d in diagnostics.iter().take(10) {
            println!("   - {d}");
        }
    }

    if !report.validation_passed() {
        eprintln!("stat mismatches found, resolve before relying on the enriched dataset");
        std::process::exit(1);
    }
    Ok(())
}
