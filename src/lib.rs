#![allow(async_fn_in_trait)]
pub mod date_range;
pub mod download_plan;
pub mod error;
pub mod frequencies;
pub mod grabber;
pub mod logger;
pub mod page;
pub mod portal;
pub mod selection;

pub use download_plan::{DownloadCommand, DownloadPlan};
pub use error::{GrabError, Stage};
pub use frequencies::Frequencies;
pub use grabber::Grabber;
pub use selection::GrabSelection;
