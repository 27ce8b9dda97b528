use std::path::PathBuf;

use anyhow::Result;

use crate::config::PipelineConfig;

/// Shared start-up for the binaries: env files, logging, then config.
pub fn bootstrap() -> Result<PipelineConfig> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let log_level = if has_flag("--verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    resolve_config(&std::env::args().skip(1).collect::<Vec<_>>())
}

/// `--config`/`VB_CONFIG` picks the JSON file; `--data-dir`/`VB_DATA_DIR`
/// overrides its data directory.
pub fn resolve_config(args: &[String]) -> Result<PipelineConfig> {
    let config_path = arg_value(args, "--config").or_else(|| env_path("VB_CONFIG"));
    let mut cfg = PipelineConfig::load_or_default(config_path.as_deref())?;
    if let Some(dir) = arg_value(args, "--data-dir").or_else(|| env_path("VB_DATA_DIR")) {
        cfg.data_dir = dir;
    }
    Ok(cfg)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

/// Accepts both `--name=value` and `--name value`.
pub fn arg_value(args: &[String], name: &str) -> Option<PathBuf> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn both_flag_spellings_parse() {
        assert_eq!(
            arg_value(&args(&["--data-dir=fixtures"]), "--data-dir"),
            Some(PathBuf::from("fixtures"))
        );
        assert_eq!(
            arg_value(&args(&["--verbose", "--data-dir", "out"]), "--data-dir"),
            Some(PathBuf::from("out"))
        );
        assert_eq!(arg_value(&args(&["--data-dir"]), "--data-dir"), None);
        assert_eq!(arg_value(&args(&["--data-dir="]), "--data-dir"), None);
    }

    #[test]
    fn data_dir_flag_overrides_config() {
        let cfg = resolve_config(&args(&["--data-dir", "elsewhere"])).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("elsewhere"));
    }
}
