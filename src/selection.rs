use crate::date_range::{MonthField, DEFAULT_SPAN_DAYS};
use crate::frequencies::{Frequencies, DEFAULT_BANDS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

pub const DEFAULT_PORTAL: &str = "http://sdac.virtualsolar.org";
pub const DEFAULT_INSTRUMENT: &str = "JSOC.SDO.AIA";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";

/// What to search for and where. Every key is optional in the TOML file.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GrabSelection {
    /// Base URL of the search portal; the wizard starts at `/cgi/search`.
    pub portal: String,
    pub instrument: String,
    pub frequencies: Vec<u32>,
    /// Length of the searched range when no end date is given.
    pub span_days: i64,
    pub month_field: MonthField,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for GrabSelection {
    fn default() -> Self {
        Self {
            portal: DEFAULT_PORTAL.to_string(),
            instrument: DEFAULT_INSTRUMENT.to_string(),
            frequencies: DEFAULT_BANDS.to_vec(),
            span_days: DEFAULT_SPAN_DAYS,
            month_field: MonthField::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
        }
    }
}

impl GrabSelection {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Unable to read selection {}", path.display()))?;
        let selection: Self = toml::from_str(&content)?;
        Ok(selection)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn portal_url(self: &Self) -> Result<Url> {
        Url::parse(&self.portal).with_context(|| format!("Invalid portal URL: {}", self.portal))
    }

    pub fn frequencies(self: &Self) -> Frequencies {
        Frequencies::new(self.frequencies.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let selection: GrabSelection = toml::from_str(
            r#"
            frequencies = [171, 193, 171]
            month_field = "legacy-hour"
            "#,
        )
        .unwrap();
        assert_eq!(selection.portal, DEFAULT_PORTAL);
        assert_eq!(selection.instrument, DEFAULT_INSTRUMENT);
        assert_eq!(selection.span_days, 60);
        assert_eq!(selection.month_field, MonthField::LegacyHour);
        assert_eq!(selection.frequencies().as_slice(), &[171, 193]);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.toml");
        let selection = GrabSelection {
            timeout_secs: Some(30),
            ..GrabSelection::default()
        };
        selection.write(&path).unwrap();

        let read = GrabSelection::read(&path).unwrap();
        assert_eq!(read, selection);
    }

    #[test]
    fn test_invalid_portal() {
        let selection = GrabSelection {
            portal: "not a url".to_string(),
            ..GrabSelection::default()
        };
        assert!(selection.portal_url().is_err());
    }
}
