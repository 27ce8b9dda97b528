use anyhow::Result;

use vb_career::{cli, enrich, summary};

fn main() -> Result<()> {
    let cfg = cli::bootstrap()?;
    let report = enrich::run(&cfg)?;

    let scored = report
        .rows
        .iter()
        .filter(|r| r.performance.score.is_some())
        .count();
    let records = report
        .rows
        .iter()
        .filter(|r| r.highs.record_breaker())
        .count();

    println!("Tags derived");
    println!("Output: {}", report.path.display());
    println!("Matches: {} (scored {scored}, record breakers {records})", report.rows.len());
    for s in summary::summarize(&report.rows) {
        println!("  {}", summary::describe(&s));
    }
    Ok(())
}
