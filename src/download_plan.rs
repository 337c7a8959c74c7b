use chrono::NaiveDate;
use std::fmt;

/// One image to fetch, printed as a curl command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCommand {
    pub date: NaiveDate,
    pub frequency: u32,
    pub href: String,
}

impl DownloadCommand {
    pub fn new(date: NaiveDate, frequency: u32, href: &str) -> Self {
        DownloadCommand {
            date,
            frequency,
            href: href.to_string(),
        }
    }

    /// e.g. `2013-01-01.94.fits`
    pub fn filename(&self) -> String {
        format!("{}.{}.fits", self.date.format("%Y-%m-%d"), self.frequency)
    }
}

impl fmt::Display for DownloadCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "curl --progress-bar -o {} \"{}\"",
            self.filename(),
            self.href
        )
    }
}

/// The outcome of one search: commands in result page order, plus the
/// requested frequencies no link was found for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    commands: Vec<DownloadCommand>,
    unmatched: Vec<u32>,
}

impl DownloadPlan {
    pub fn new(commands: Vec<DownloadCommand>, unmatched: Vec<u32>) -> Self {
        Self {
            commands,
            unmatched,
        }
    }

    pub fn commands(&self) -> &[DownloadCommand] {
        &self.commands
    }

    pub fn unmatched(&self) -> &[u32] {
        &self.unmatched
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// One command per line, ready to be piped into a shell.
impl fmt::Display for DownloadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for command in self.commands.iter() {
            writeln!(f, "{}", command)?;
        }
        Ok(())
    }
}
