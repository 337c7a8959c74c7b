use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Days covered by a search when no end date is given.
pub const DEFAULT_SPAN_DAYS: i64 = 60;

/// How the `startmonth`/`endmonth` fields are filled in.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MonthField {
    /// Two digit month of the year.
    #[default]
    Calendar,
    /// Two digit hour of midnight, i.e. always "00". Kept to reproduce
    /// searches recorded by older versions of the grabber.
    LegacyHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The range covering `span_days` from `start`. Fails when the end date
    /// is not representable.
    pub fn starting(start: NaiveDate, span_days: i64) -> Result<Self> {
        let end = TimeDelta::try_days(span_days)
            .and_then(|span| start.checked_add_signed(span))
            .ok_or(anyhow!(
                "A span of {} days from {} is out of range",
                span_days,
                start
            ))?;
        Ok(Self { start, end })
    }

    /// Values for the portal's start/end time fields. The end minute is 01 so
    /// that a range starting and ending on the same day is not empty.
    pub fn form_fields(&self, month: MonthField) -> Vec<(&'static str, String)> {
        vec![
            ("startyear", format!("{:04}", self.start.year())),
            ("startmonth", month_value(self.start, month)),
            ("startday", format!("{:02}", self.start.day())),
            ("starthour", "00".to_string()),
            ("startminute", "00".to_string()),
            ("endyear", format!("{:04}", self.end.year())),
            ("endmonth", month_value(self.end, month)),
            ("endday", format!("{:02}", self.end.day())),
            ("endhour", "00".to_string()),
            ("endminute", "01".to_string()),
        ]
    }
}

/// The first day of every month of `year`, in order.
pub fn month_starts(year: i32) -> Result<Vec<NaiveDate>> {
    (1..=12)
        .map(|month| {
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(anyhow!("Invalid year: {}", year))
        })
        .collect()
}

fn month_value(date: NaiveDate, month: MonthField) -> String {
    match month {
        MonthField::Calendar => format!("{:02}", date.month()),
        MonthField::LegacyHour => date.and_time(NaiveTime::MIN).format("%H").to_string(),
    }
}
