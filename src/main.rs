use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use vso_grab::date_range::month_starts;
use vso_grab::grabber::grab_months;
use vso_grab::{logger, GrabSelection, Grabber};

#[derive(Parser)]
/// Prints curl commands fetching one image per AIA band from the Virtual Solar
/// Observatory, searching from the first day of every month of YEAR.
///
/// Pipe the output into a shell to download the files.
struct Args {
    /// Year to search
    #[arg(default_value_t = 2013)]
    year: i32,

    /// TOML file overriding the portal, instrument, bands or time span
    #[arg(long, short, value_name = "PATH")]
    selection: Option<PathBuf>,

    /// Write the default selection to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_selection: Option<PathBuf>,

    /// Log every request to stderr
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if let Some(path) = args.write_selection {
        GrabSelection::default().write(&path)?;
        info!(path = %path.display(), "Wrote default selection");
        return Ok(());
    }

    let selection = match args.selection {
        Some(path) => GrabSelection::read(path)?,
        None => GrabSelection::default(),
    };

    // Fresh session per month; the portal keeps search state in cookies.
    grab_months(
        &month_starts(args.year)?,
        || Grabber::from_selection(selection.clone()),
        &mut std::io::stdout(),
    )
    .await
}
