mod common;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use common::fixture_workspace;
use vb_career::archive;
use vb_career::pipeline;
use vb_career::season::Season;
use vb_career::table::Table;

/// Enriched rows in file order as (match_key, column -> cell).
fn read_rows(path: &Path) -> Vec<(String, HashMap<String, String>)> {
    let table = Table::read(path).unwrap();
    let headers = table.headers().to_vec();
    table
        .rows()
        .map(|row| {
            let cells: HashMap<String, String> = headers
                .iter()
                .map(|h| (h.clone(), row.cell(h).unwrap_or_default().to_string()))
                .collect();
            (cells["match_key"].clone(), cells)
        })
        .collect()
}

fn by_key(rows: &[(String, HashMap<String, String>)]) -> HashMap<String, HashMap<String, String>> {
    rows.iter().cloned().collect()
}

#[test]
fn fixture_career_runs_end_to_end() {
    let (_tmp, cfg) = fixture_workspace();
    let report = pipeline::run(&cfg).expect("pipeline should succeed on fixture");

    assert!(report.validation_passed());
    assert_eq!(report.schedule.rows, 17);
    assert_eq!(report.schedule.per_season[&Season::Junior], 2);
    assert_eq!(report.stats.total_rows, 17);
    assert_eq!(report.stats.placeholders, 2);
    assert_eq!(report.stats.dnp, 3);
    assert!(
        report
            .stats
            .diagnostics
            .iter()
            .any(|d| d.contains("sophomore") && d.contains("blocking.csv"))
    );
    assert_eq!(report.merge.rows, 17);
    assert_eq!(report.enriched_rows, 17);
    assert_eq!(report.export.seasons, 4);
    assert!(cfg.workbook_path().exists());
    assert_eq!(report.archive.enriched_sha256.len(), 64);

    let rows = read_rows(&cfg.enriched_path());
    let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "FR_09-01_MARET_1",
            "FR_09-03_BULLIS_1",
            "FR_09-03_MARET_2",
            "FR_09-10_MSD_1",
            "FR_09-24_CSHC_1",
            "FR_11-11_FRIENDS_1",
            "SO_09-05_MARET_1",
            "SO_09-12_BULLIS_1",
            "SO_09-18_BHA_1",
            "SO_10-30_WIS_1",
            "JR_09-27_BOHS_1",
            "JR_10-02_WILSON_1",
            "SR_09-07_FRIENDS_1",
            "SR_09-21_MARET_1",
            "SR_09-21_BULLIS_2",
            "SR_10-21_MCLEAN_1",
            "SR_10-30_WIS_1",
        ]
    );

    let win: Vec<&str> = rows[..6].iter().map(|(_, r)| r["win_streak"].as_str()).collect();
    let loss: Vec<&str> = rows[..6].iter().map(|(_, r)| r["loss_streak"].as_str()).collect();
    assert_eq!(win, vec!["0", "0", "1", "2", "0", "1"]);
    assert_eq!(loss, vec!["1", "2", "0", "0", "0", "0"]);

    let m = by_key(&rows);
    let first = &m["FR_09-01_MARET_1"];
    assert_eq!(first["milestone_flag"], "first MSSD match; first FR match");
    assert_eq!(first["career_stage"], "early");
    assert_eq!(first["day_of_week"], "Thursday");
    assert_eq!(m["SR_10-30_WIS_1"]["milestone_flag"], "last SR match; last MSSD match");

    let comeback = &m["FR_09-03_MARET_2"];
    assert_eq!(comeback["match_no"], "2");
    assert_eq!(comeback["revenge_match"], "true");
    assert_eq!(comeback["comeback_win"], "true");
    assert_eq!(comeback["deciding_set_win"], "true");
    assert_eq!(comeback["team_needed_win"], "true");
    assert_eq!(comeback["confidence_boost_game"], "true");
    assert_eq!(comeback["performance_percentile"], "100");
    assert_eq!(comeback["highlight_match"], "true");
    assert_eq!(comeback["last_match_of_day"], "true");

    let sweep = &m["FR_09-10_MSD_1"];
    assert_eq!(sweep["rivalry"], "true");
    assert_eq!(sweep["deaf_school"], "true");
    assert_eq!(sweep["dominant_sweep"], "true");
    assert_eq!(sweep["performance_score"], "32");
    assert_eq!(sweep["performance_efficiency"], "32");
    assert_eq!(sweep["defensive_impact"], "3.5");
    assert_eq!(sweep["performance_percentile"], "80");
    assert_eq!(sweep["low_error_game"], "true");
    assert_eq!(sweep["season_highs_flags"], "kills;aces;points");
    assert_eq!(sweep["career_highs_flags"], "");
    assert_eq!(sweep["record_breaker_flag"], "false");
    assert_eq!(sweep["first_match_of_day"], "");

    let forfeit = &m["FR_09-24_CSHC_1"];
    assert_eq!(forfeit["match_type"], "forfeit");
    assert_eq!(forfeit["did_play"], "false");
    assert_eq!(forfeit["performance_score"], "");
    assert_eq!(forfeit["performance_percentile"], "");
    assert_eq!(forfeit["kills"], "");
    assert_eq!(forfeit["season_avg_performance"], "25.1128");

    assert_eq!(m["SO_09-12_BULLIS_1"]["redemption_game"], "true");
    assert_eq!(m["SO_09-18_BHA_1"]["match_type"], "sick");
    let wis = &m["SO_10-30_WIS_1"];
    assert_eq!(wis["deciding_set_loss"], "true");
    assert_eq!(wis["game_importance_score"], "3");
    assert_eq!(wis["career_highs_flags"], "assists");
    assert_eq!(wis["total_blocks"], "");

    let injured = &m["JR_09-27_BOHS_1"];
    assert_eq!(injured["sets_played"], "1");
    assert_eq!(injured["stats_available"], "false");
    assert_eq!(injured["played_all_sets"], "false");
    assert_eq!(injured["performance_score"], "");
    assert_eq!(m["JR_10-02_WILSON_1"]["opponent"], "Woodrow Wilson");

    let birthday = &m["SR_09-21_MARET_1"];
    assert_eq!(birthday["birthday_match"], "true");
    assert_eq!(birthday["match_type"], "tournament_pool");
    assert_eq!(birthday["multi_game_day"], "true");
    assert_eq!(birthday["career_highs_flags"], "kills;aces;points");
    assert_eq!(birthday["record_breaker_flag"], "true");
    assert_eq!(m["SR_09-21_BULLIS_2"]["career_highs_flags"], "digs;receiving");
    assert_eq!(m["SR_09-07_FRIENDS_1"]["career_highs_flags"], "total_blocks");

    let finale = &m["SR_10-30_WIS_1"];
    assert_eq!(finale["performance_percentile"], "75");
    assert_eq!(finale["clutch_performance"], "true");
    assert_eq!(finale["highlight_match"], "false");
    assert_eq!(finale["win_streak"], "1");
    assert_eq!(m["SR_10-21_MCLEAN_1"]["win_streak"], "0");

    let junior = report
        .summaries
        .iter()
        .find(|s| s.season == Season::Junior)
        .unwrap();
    assert_eq!(junior.record(), "2-0-0");
    assert_eq!(junior.totals, None);
    assert_eq!(junior.avg_performance, None);
}

#[test]
fn rerun_produces_identical_outputs() {
    let (_tmp, cfg) = fixture_workspace();
    pipeline::run(&cfg).unwrap();
    let paths = [
        cfg.cleaned_schedule_path(),
        cfg.all_stats_path(),
        cfg.season_stats_path(Season::Freshman),
        cfg.merged_dataset_path(),
        cfg.enriched_path(),
    ];
    let first: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();
    let first_report = pipeline::run(&cfg).unwrap();
    let second: Vec<Vec<u8>> = paths.iter().map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(first, second);

    let conn = archive::open_db(&cfg.archive_path()).unwrap();
    assert_eq!(archive::run_count(&conn).unwrap(), 2);
    let keys = archive::archived_keys(&conn).unwrap();
    assert_eq!(keys.len(), 17);
    assert_eq!(keys[0], "FR_09-01_MARET_1");
    assert_eq!(
        first_report.archive.enriched_sha256,
        archive::file_sha256(&cfg.enriched_path()).unwrap()
    );

    let logged: String = conn
        .query_row(
            "SELECT diagnostics_json FROM pipeline_runs WHERE run_id = ?1",
            [first_report.archive.run_id],
            |row| row.get(0),
        )
        .unwrap();
    let logged: Vec<String> = serde_json::from_str(&logged).unwrap();
    assert_eq!(logged, first_report.diagnostics());
    assert!(logged.iter().any(|d| d.contains("blocking.csv")));
}

#[test]
fn season_streak_scope_can_span_the_career() {
    let (_tmp, mut cfg) = fixture_workspace();
    cfg.streak_scope = vb_career::config::StreakScope::Career;
    pipeline::run(&cfg).unwrap();
    let m = by_key(&read_rows(&cfg.enriched_path()));
    // FR ends on a win, SO opens with a win.
    assert_eq!(m["SO_09-05_MARET_1"]["win_streak"], "2");
    assert_eq!(m["SO_09-05_MARET_1"]["prev_result"], "W");
}
