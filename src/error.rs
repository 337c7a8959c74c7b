use std::fmt;
use thiserror::Error;

/// The page of the search wizard a failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SearchEntry,
    InstrumentAndDates,
    BandSelection,
    Cart,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SearchEntry => "search entry page",
            Self::InstrumentAndDates => "instrument and date page",
            Self::BandSelection => "band selection page",
            Self::Cart => "cart page",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum GrabError {
    #[error("{stage}: unable to locate {locator}")]
    Locator { stage: Stage, locator: String },

    #[error("Request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl GrabError {
    pub fn locator(stage: Stage, locator: impl Into<String>) -> Self {
        Self::Locator {
            stage,
            locator: locator.into(),
        }
    }
}
