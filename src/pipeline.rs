use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};

use crate::archive::{self, ArchiveRun, ArchiveSummary};
use crate::config::PipelineConfig;
use crate::enrich::{self, enriched_columns};
use crate::export::{self, ExportReport};
use crate::final_merge::{self, FinalMergeReport};
use crate::schedule::{self, ScheduleReport};
use crate::stats_merge::{self, MergeReport};
use crate::summary::{self, SeasonSummary};

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub schedule: ScheduleReport,
    pub stats: MergeReport,
    pub merge: FinalMergeReport,
    pub enriched_rows: usize,
    pub summaries: Vec<SeasonSummary>,
    pub export: ExportReport,
    pub archive: ArchiveSummary,
}

impl PipelineReport {
    pub fn validation_passed(&self) -> bool {
        self.merge.validation_passed()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        collect_diagnostics(&self.stats, &self.merge)
    }
}

fn collect_diagnostics(stats: &MergeReport, merge: &FinalMergeReport) -> Vec<String> {
    let mut out = stats.diagnostics.clone();
    out.extend(
        merge
            .integrity
            .missing_files
            .iter()
            .map(|p| format!("missing season stats file {}", p.display())),
    );
    out.extend(merge.integrity.mismatches.iter().map(|m| m.to_string()));
    out
}

/// Run every stage in order. Each stage reads the previous stage's file.
pub fn run(cfg: &PipelineConfig) -> Result<PipelineReport> {
    let started_at = Utc::now().to_rfc3339();
    info!("pipeline start, data dir {}", cfg.data_dir.display());

    let schedule = schedule::run(cfg).context("schedule normalizer")?;
    let stats = stats_merge::run(cfg).context("stat merger")?;
    let merge = final_merge::run(cfg).context("final merge")?;
    if !merge.validation_passed() {
        warn!("stat integrity check failed, continuing so outputs can be inspected");
    }
    let enriched = enrich::run(cfg).context("tag deriver")?;

    let summaries = summary::summarize(&enriched.rows);
    for s in &summaries {
        info!("{}", summary::describe(s));
    }
    let export = export::export_workbook(&cfg.workbook_path(), &summaries, &enriched.rows)?;

    let diagnostics = collect_diagnostics(&stats, &merge);
    let mut conn = archive::open_db(&cfg.archive_path())?;
    let archive = archive::archive_run(
        &mut conn,
        &enriched.rows,
        &enriched_columns(),
        &ArchiveRun {
            started_at,
            validation_passed: merge.validation_passed(),
            enriched_csv: &enriched.path,
            diagnostics: &diagnostics,
        },
    )?;
    info!(
        "archived run {} ({} matches, sha256 {})",
        archive.run_id, archive.matches, archive.enriched_sha256
    );

    Ok(PipelineReport {
        schedule,
        stats,
        merge,
        enriched_rows: enriched.rows.len(),
        summaries,
        export,
        archive,
    })
}
