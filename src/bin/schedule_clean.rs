use anyhow::Result;

use vb_career::{cli, schedule};

fn main() -> Result<()> {
    let cfg = cli::bootstrap()?;
    let report = schedule::run(&cfg)?;

    println!("Schedule cleaned");
    println!("Output: {}", cfg.cleaned_schedule_path().display());
    println!("Matches: {}", report.rows);
    for (season, count) in &report.per_season {
        println!("season {season}: {count}");
    }
    Ok(())
}
