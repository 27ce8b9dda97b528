pub mod archive;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod final_merge;
pub mod highs;
pub mod milestones;
pub mod narrative;
pub mod opponents;
pub mod outcome;
pub mod percentile;
pub mod performance;
pub mod pipeline;
pub mod schedule;
pub mod season;
pub mod stats;
pub mod stats_merge;
pub mod streaks;
pub mod summary;
pub mod table;
pub mod validate;
