//! Drives the VSO search wizard for one date range:
//!
//! 1. search entry page: ask for an instrument search
//! 2. instrument page: pick the instrument and the time range
//! 3. band table: tick one row per requested wavelength
//! 4. cart: fire the request
//! 5. results: turn the record links into download commands
//!
//! Every page is needed to find the next form, so the steps run strictly in
//! order against a single session.
use crate::date_range::{DateRange, MonthField};
use crate::download_plan::{DownloadCommand, DownloadPlan};
use crate::error::{GrabError, Stage};
use crate::frequencies::Frequencies;
use crate::page::{is_checkbox_named, Page};
use crate::portal::{Portal, Session};
use crate::selection::GrabSelection;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use regex::Regex;
use scraper::Selector;
use std::io::Write;
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

const SEARCH_PATH: &str = "/cgi/search";
const VSOUI_PATH: &str = "/cgi/vsoui";
const CART_PATH: &str = "/cgi/cartui";

const INSTRUMENT_CHECKBOX: &str = "instrument";
const BAND_CHECKBOX: &str = "data";
const REQUEST_BUTTON: &str = "requestdata";
const FIRE_BUTTON: &str = "cartFireRequest";

static BAND_ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#tableBody tr").unwrap());
static BAND_CHECKBOX_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[name=data]").unwrap());
static DATA_INPUTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name=data]").unwrap());
static WAVELENGTH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[name=__waveminu]").unwrap());
static RESULT_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".col-B a").unwrap());
static RECORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"record=(\d+)").unwrap());

/// A row of the band table: which `data` checkbox it owns (its position among
/// the page's `data` checkboxes) and the wavelength it is labelled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandRow {
    pub control: Option<usize>,
    pub wavelength: Option<u32>,
}

/// A download link on the results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLink {
    pub href: String,
    pub record: String,
}

impl RecordLink {
    pub fn parse(href: &str) -> Option<Self> {
        let caps = RECORD_RE.captures(href)?;
        Some(Self {
            href: href.to_string(),
            record: caps[1].to_string(),
        })
    }
}

pub struct Grabber<P: Portal> {
    portal: P,
    selection: GrabSelection,
    search_url: Url,
}

impl Grabber<Session> {
    /// A grabber with its own fresh session against the configured portal.
    pub fn from_selection(selection: GrabSelection) -> Result<Self> {
        let session = Session::from_selection(&selection)?;
        Self::new(session, selection)
    }
}

impl<P: Portal> Grabber<P> {
    pub fn new(portal: P, selection: GrabSelection) -> Result<Self> {
        let search_url = selection.portal_url()?.join(SEARCH_PATH)?;
        Ok(Self {
            portal,
            selection,
            search_url,
        })
    }

    /// Runs the whole wizard. Without `end` the range covers the configured
    /// span from `start`; without `frequencies` the configured bands are used.
    /// Nothing is returned unless every step succeeded.
    pub async fn get(
        self: &Self,
        start: NaiveDate,
        end: Option<NaiveDate>,
        frequencies: Option<&Frequencies>,
    ) -> Result<DownloadPlan> {
        let range = match end {
            Some(end) => DateRange::new(start, end),
            None => DateRange::starting(start, self.selection.span_days)?,
        };
        let requested = match frequencies {
            Some(f) => f.clone(),
            None => self.selection.frequencies(),
        };
        if requested.is_empty() {
            return Err(anyhow!("No frequencies selected for download"));
        }
        info!(
            start = %range.start,
            end = %range.end,
            bands = ?requested.as_slice(),
            "Searching {}",
            self.selection.instrument
        );

        let page = self.portal.fetch(&self.search_url).await?;
        let page = search_by_instrument(&self.portal, page).await?;
        let page = choose_instrument_and_range(
            &self.portal,
            page,
            &self.selection.instrument,
            &range,
            self.selection.month_field,
        )
        .await?;
        let page = request_bands(&self.portal, page, &requested).await?;
        let page = fire_cart(&self.portal, page).await?;

        let plan = collect_downloads(&record_links(&page), range.start, &requested);
        for band in plan.unmatched() {
            warn!(band, start = %range.start, "No download link found");
        }
        info!(commands = plan.commands().len(), "Search complete");
        Ok(plan)
    }
}

pub async fn search_by_instrument(portal: &impl Portal, page: Page) -> Result<Page> {
    let mut form = page.form_with_action(Stage::SearchEntry, SEARCH_PATH)?;
    form.check_named(INSTRUMENT_CHECKBOX)?;
    debug!("Requesting instrument search");
    portal.submit(form.submission(None)?).await
}

pub async fn choose_instrument_and_range(
    portal: &impl Portal,
    page: Page,
    instrument: &str,
    range: &DateRange,
    month: MonthField,
) -> Result<Page> {
    let mut form = page.form_with_action(Stage::InstrumentAndDates, VSOUI_PATH)?;
    form.check_by_value(instrument)?;
    for (name, value) in range.form_fields(month) {
        form.set_field(name, value)?;
    }
    debug!(instrument, "Submitting instrument and time range");
    portal.submit(form.submission(None)?).await
}

pub async fn request_bands(
    portal: &impl Portal,
    page: Page,
    requested: &Frequencies,
) -> Result<Page> {
    let mut form = page.form_with_action(Stage::BandSelection, VSOUI_PATH)?;
    let rows = band_rows(&page);
    let picks = select_bands(&rows, requested);
    for (row, checked) in rows.iter().zip(picks) {
        let index = row.control.ok_or_else(|| {
            GrabError::locator(Stage::BandSelection, "data checkbox of a band row")
        })?;
        form.set_checked_nth(BAND_CHECKBOX, index, checked)?;
    }
    debug!(rows = rows.len(), "Requesting selected bands");
    portal.submit(form.submission(Some(REQUEST_BUTTON))?).await
}

pub async fn fire_cart(portal: &impl Portal, page: Page) -> Result<Page> {
    let form = page.form_with_action(Stage::Cart, CART_PATH)?;
    debug!("Firing cart request");
    portal.submit(form.submission(Some(FIRE_BUTTON))?).await
}

pub fn band_rows(page: &Page) -> Vec<BandRow> {
    let html = page.html();
    let data_checkboxes: Vec<_> = html
        .select(&DATA_INPUTS)
        .filter(|e| is_checkbox_named(e, BAND_CHECKBOX))
        .map(|e| e.id())
        .collect();
    let rows = html
        .select(&BAND_ROWS)
        .filter_map(|row| {
            let checkbox = row.select(&BAND_CHECKBOX_SEL).next()?;
            let label: String = row.select(&WAVELENGTH).flat_map(|e| e.text()).collect();
            Some(BandRow {
                control: data_checkboxes.iter().position(|&id| id == checkbox.id()),
                wavelength: leading_integer(&label),
            })
        })
        .collect();
    rows
}

/// Whether each row should be ticked: only the first row of every requested
/// wavelength is.
pub fn select_bands(rows: &[BandRow], requested: &Frequencies) -> Vec<bool> {
    let mut remaining = requested.remaining();
    rows.iter()
        .map(|row| match row.wavelength {
            Some(wavelength) => remaining.take(wavelength),
            None => false,
        })
        .collect()
}

pub fn record_links(page: &Page) -> Vec<RecordLink> {
    let html = page.html();
    let links = html
        .select(&RESULT_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(RecordLink::parse)
        .collect();
    links
}

/// Pairs each requested frequency with the first link whose record id reads
/// the same, in the order the links appear.
pub fn collect_downloads(
    links: &[RecordLink],
    date: NaiveDate,
    requested: &Frequencies,
) -> DownloadPlan {
    let mut remaining = requested.remaining();
    let mut commands = vec![];
    for link in links {
        if remaining.is_empty() {
            break;
        }
        if let Some(band) = remaining.take_first(|b| b.to_string() == link.record) {
            commands.push(DownloadCommand::new(date, band, &link.href));
        }
    }
    DownloadPlan::new(commands, remaining.into_vec())
}

/// Runs one search per date with a fresh grabber each, writing a `# MM`
/// header before each month's commands. Stops at the first failing month.
pub async fn grab_months<P, W>(
    starts: &[NaiveDate],
    mut grabber_for: impl FnMut() -> Result<Grabber<P>>,
    out: &mut W,
) -> Result<()>
where
    P: Portal,
    W: Write,
{
    for &start in starts {
        writeln!(out, "# {}", start.format("%m"))?;
        let grabber = grabber_for()?;
        let plan = grabber.get(start, None, None).await?;
        if plan.is_empty() {
            warn!(%start, "Nothing to download");
        }
        write!(out, "{}", plan)?;
        out.flush()?;
    }
    Ok(())
}

/// `" 94.0 A"` -> 94
fn leading_integer(text: &str) -> Option<u32> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}
