//! The HTTP side of the search wizard. The portal keeps session cookies between
//! pages, so one `Portal` must only ever drive one search at a time.
use crate::error::GrabError;
use crate::page::{Method, Page, Submission};
use crate::selection::GrabSelection;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub trait Portal {
    async fn fetch(self: &Self, url: &Url) -> Result<Page>;

    async fn submit(self: &Self, submission: Submission) -> Result<Page>;
}

/// A cookie-carrying reqwest session against the live portal.
pub struct Session {
    client: reqwest::Client,
}

impl Session {
    pub fn from_selection(selection: &GrabSelection) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(selection.user_agent.as_str());
        if let Some(secs) = selection.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn read_page(self: &Self, request: reqwest::RequestBuilder, url: &Url) -> Result<Page> {
        let network = |source: reqwest::Error| GrabError::Network {
            url: url.to_string(),
            source,
        };
        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        let final_url = response.url().clone();
        let body = response.text().await.map_err(network)?;
        debug!(url = %final_url, bytes = body.len(), "Received page");
        Ok(Page::new(final_url, body))
    }
}

impl Portal for Session {
    async fn fetch(self: &Self, url: &Url) -> Result<Page> {
        debug!(%url, "GET");
        self.read_page(self.client.get(url.clone()), url).await
    }

    async fn submit(self: &Self, submission: Submission) -> Result<Page> {
        let Submission {
            method,
            url,
            params,
        } = submission;
        debug!(%url, ?method, fields = params.len(), "Submitting form");
        let request = match method {
            Method::Get => self.client.get(url.clone()).query(&params),
            Method::Post => self.client.post(url.clone()).form(&params),
        };
        self.read_page(request, &url).await
    }
}
