use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::StringRecord;

use crate::error::PipelineError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A CSV file loaded into memory with header-indexed access.
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    headers: Vec<String>,
    index: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("open csv {}", path.display()))?;
        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("read headers of {}", path.display()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("read row of {}", path.display()))?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            records.push(record);
        }
        Ok(Self::from_parts(path.to_path_buf(), headers, records))
    }

    fn from_parts(path: PathBuf, headers: Vec<String>, records: Vec<StringRecord>) -> Table {
        let index = headers
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.clone(), idx))
            .collect();
        Table {
            path,
            headers,
            index,
            records,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn require_columns(&self, names: &[&str]) -> Result<(), PipelineError> {
        for name in names {
            if !self.has_column(name) {
                return Err(PipelineError::MissingColumn {
                    path: self.path.clone(),
                    column: (*name).to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().enumerate().map(|(idx, record)| Row {
            table: self,
            record,
            line: idx + 1,
        })
    }
}

/// One data row of a [`Table`]. `line` is 1-based and excludes the header.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    record: &'a StringRecord,
    line: usize,
}

impl<'a> Row<'a> {
    /// Raw cell, or `None` when the column does not exist.
    pub fn cell(&self, column: &str) -> Option<&'a str> {
        let idx = *self.table.index.get(column)?;
        Some(self.record.get(idx).unwrap_or_default())
    }

    pub fn text(&self, column: &str) -> Result<&'a str> {
        self.cell(column).ok_or_else(|| {
            PipelineError::MissingColumn {
                path: self.table.path.clone(),
                column: column.to_string(),
            }
            .into()
        })
    }

    /// Non-empty cell text; missing columns read as empty.
    pub fn opt_text(&self, column: &str) -> Option<String> {
        self.cell(column)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn parse<T: FromStr>(&self, column: &str) -> Result<T> {
        let raw = self.text(column)?;
        raw.parse::<T>()
            .map_err(|_| self.invalid(column, raw).into())
    }

    pub fn opt_parse<T: FromStr>(&self, column: &str) -> Result<Option<T>> {
        match self.cell(column) {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| self.invalid(column, raw).into()),
        }
    }

    /// Boolean cell; missing and empty read as false.
    pub fn flag(&self, column: &str) -> Result<bool> {
        Ok(self.opt_flag(column)?.unwrap_or(false))
    }

    pub fn opt_flag(&self, column: &str) -> Result<Option<bool>> {
        match self.cell(column) {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => parse_flag(raw)
                .map(Some)
                .ok_or_else(|| self.invalid(column, raw).into()),
        }
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate> {
        let raw = self.text(column)?;
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| self.invalid(column, raw).into())
    }

    pub fn invalid(&self, column: &str, value: &str) -> PipelineError {
        PipelineError::InvalidValue {
            path: self.table.path.clone(),
            row: self.line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Write a CSV next to `path` and swap it in, so a failed run never leaves a
/// half-written output behind.
pub fn write_csv_atomic<H, I>(path: &Path, headers: &[H], rows: I) -> Result<usize>
where
    H: AsRef<str>,
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    let mut written = 0usize;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        writer
            .write_record(headers.iter().map(AsRef::as_ref))
            .context("write csv header")?;
        for row in rows {
            debug_assert_eq!(row.len(), headers.len());
            writer.write_record(&row).context("write csv row")?;
            written += 1;
        }
        writer.flush().context("flush csv")?;
    }
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(written)
}

/// Round to 4 decimals; integral values render without a fraction.
pub fn fmt_f64(v: f64) -> String {
    let r = (v * 10_000.0).round() / 10_000.0;
    let r = if r == 0.0 { 0.0 } else { r };
    format!("{r}")
}

pub fn fmt_opt_f64(v: Option<f64>) -> String {
    v.map(fmt_f64).unwrap_or_default()
}

pub fn fmt_opt<T: Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

pub fn fmt_bool(v: bool) -> String {
    if v { "true" } else { "false" }.to_string()
}

pub fn fmt_opt_bool(v: Option<bool>) -> String {
    v.map(fmt_bool).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_render_deterministically() {
        assert_eq!(fmt_f64(3.0), "3");
        assert_eq!(fmt_f64(0.1 + 0.2), "0.3");
        assert_eq!(fmt_f64(-0.00001), "0");
        assert_eq!(fmt_f64(2.0 / 3.0), "0.6667");
        assert_eq!(fmt_opt_f64(None), "");
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn atomic_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("t.csv");
        let rows = vec![
            vec!["a".to_string(), "".to_string(), "true".to_string()],
            vec!["b".to_string(), "2".to_string(), "".to_string()],
        ];
        let n = write_csv_atomic(&path, &["key", "n", "flag"], rows).unwrap();
        assert_eq!(n, 2);
        assert!(!path.with_extension("csv.tmp").exists());

        let table = Table::read(&path).unwrap();
        let rows: Vec<Row<'_>> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].opt_parse::<u32>("n").unwrap(), None);
        assert_eq!(rows[1].opt_parse::<u32>("n").unwrap(), Some(2));
        assert!(rows[0].flag("flag").unwrap());
        assert!(!rows[1].flag("flag").unwrap());
        assert!(rows[0].text("missing").is_err());
        assert!(table.require_columns(&["key", "nope"]).is_err());
    }
}
