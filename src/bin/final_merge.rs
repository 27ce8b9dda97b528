use anyhow::Result;

use vb_career::{cli, final_merge};

fn main() -> Result<()> {
    let cfg = cli::bootstrap()?;
    let report = final_merge::run(&cfg)?;

    println!("Final merge complete");
    println!("Output: {}", report.path.display());
    println!("Matches: {}", report.rows);
    println!(
        "Seasons checked: {}",
        report
            .integrity
            .seasons_checked
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for path in &report.integrity.missing_files {
        println!("  missing: {}", path.display());
    }
    if !report.integrity.mismatches.is_empty() {
        println!("  mismatches: {}", report.integrity.mismatches.len());
        for m in report.integrity.mismatches.iter().take(10) {
            println!("   - {m}");
        }
    }

    if !report.validation_passed() {
        eprintln!("stat mismatches found, resolve before proceeding");
        std::process::exit(1);
    }
    Ok(())
}
