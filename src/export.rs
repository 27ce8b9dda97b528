use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::enrich::{EnrichedMatch, enriched_columns};
use crate::summary::{SUMMARY_COLUMNS, SeasonSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    pub seasons: usize,
    pub matches: usize,
}

/// Write the `Seasons` and `Matches` sheets.
pub fn export_workbook(
    path: &Path,
    summaries: &[SeasonSummary],
    matches: &[EnrichedMatch],
) -> Result<ExportReport> {
    let mut season_rows = vec![SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect()];
    season_rows.extend(summaries.iter().map(SeasonSummary::to_record));

    let mut match_rows = vec![enriched_columns()];
    match_rows.extend(matches.iter().map(EnrichedMatch::to_record));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Seasons")?;
        write_rows(sheet, &season_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matches")?;
        write_rows(sheet, &match_rows)?;
    }

    let tmp = path.with_extension("xlsx.tmp");
    workbook
        .save(&tmp)
        .with_context(|| format!("failed writing workbook to {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;

    Ok(ExportReport {
        seasons: season_rows.len().saturating_sub(1),
        matches: match_rows.len().saturating_sub(1),
    })
}

/// Numeric-looking cells are written as numbers so the sheet sorts properly.
fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            match value.parse::<f64>() {
                Ok(n) if row_idx > 0 && n.is_finite() => {
                    worksheet
                        .write_number(r, c, n)
                        .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
                }
                _ if value.is_empty() => {}
                _ => {
                    worksheet
                        .write_string(r, c, value)
                        .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
                }
            }
        }
    }
    Ok(())
}
