use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// The four ordered seasons of a high-school career.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    #[serde(rename = "FR")]
    Freshman,
    #[serde(rename = "SO")]
    Sophomore,
    #[serde(rename = "JR")]
    Junior,
    #[serde(rename = "SR")]
    Senior,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Freshman,
        Season::Sophomore,
        Season::Junior,
        Season::Senior,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Season::Freshman => "FR",
            Season::Sophomore => "SO",
            Season::Junior => "JR",
            Season::Senior => "SR",
        }
    }

    /// Directory name of the season's raw stat sheets.
    pub fn folder(self) -> &'static str {
        match self {
            Season::Freshman => "freshman",
            Season::Sophomore => "sophomore",
            Season::Junior => "junior",
            Season::Senior => "senior",
        }
    }

    pub fn previous(self) -> Option<Season> {
        match self {
            Season::Freshman => None,
            Season::Sophomore => Some(Season::Freshman),
            Season::Junior => Some(Season::Sophomore),
            Season::Senior => Some(Season::Junior),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Season {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FR" | "FRESHMAN" => Ok(Season::Freshman),
            "SO" | "SOPHOMORE" => Ok(Season::Sophomore),
            "JR" | "JUNIOR" => Ok(Season::Junior),
            "SR" | "SENIOR" => Ok(Season::Senior),
            other => Err(anyhow!("unknown season code '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Season;

    #[test]
    fn seasons_order_chronologically() {
        let mut shuffled = vec![Season::Senior, Season::Freshman, Season::Junior, Season::Sophomore];
        shuffled.sort();
        assert_eq!(shuffled, Season::ALL.to_vec());
        assert_eq!(Season::Junior.previous(), Some(Season::Sophomore));
        assert_eq!(Season::Freshman.previous(), None);
    }

    #[test]
    fn parses_codes_and_folder_names() {
        assert_eq!("sr".parse::<Season>().unwrap(), Season::Senior);
        assert_eq!("junior".parse::<Season>().unwrap(), Season::Junior);
        assert!("5th".parse::<Season>().is_err());
    }
}
