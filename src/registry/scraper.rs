//! Fines listing fetcher

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::config::RegistryConfig;
use super::error::ScrapeError;
use super::parser;
use super::session::Session;
use super::traits::FineFetcher;
use super::transport::{HttpTransport, RegistryRequest, RegistryResponse};
use super::types::{FineListing, FineRecord, MediaLink};

/// Fetches listings and resolves media viewer links to files
///
/// Performs no retries; an expired session surfaces as `ScrapeError::Auth`
/// for the caller to handle.
pub struct Scraper<T> {
    transport: T,
    config: Arc<RegistryConfig>,
}

/// Outcome of resolving one viewer link
enum Resolved {
    Direct(String),
    Failed(String),
}

impl<T: HttpTransport> Scraper<T> {
    pub fn new(transport: T, config: Arc<RegistryConfig>) -> Self {
        Self { transport, config }
    }

    async fn fetch_listing_page(
        &self,
        session: &Session,
        plate: &str,
    ) -> Result<RegistryResponse, ScrapeError> {
        let request = RegistryRequest::post_form(
            self.config.search_url(),
            &[("plate", plate), ("srchfines", "")],
        )
        .with_cookies(session.cookie_header());

        let response = self.transport.send(request).await?;

        if let Some(reason) = parser::detect_session_expiry(&response) {
            return Err(ScrapeError::Auth {
                reason: reason.to_string(),
            });
        }
        if !response.is_success() {
            return Err(ScrapeError::Network {
                message: format!("HTTP {} from {}", response.status, response.url),
            });
        }
        Ok(response)
    }

    /// Resolve every record's media links within the detail request budget
    async fn resolve_media(
        &self,
        session: &Session,
        fines: &mut [FineRecord],
        set_cookies: &mut Vec<String>,
    ) {
        let mut budget = self.config.max_detail_requests;
        let mut exhausted_logged = false;

        for fine in fines.iter_mut() {
            let mut resolved = Vec::with_capacity(fine.media_links.len());
            let mut failure = None;

            for link in &fine.media_links {
                if let Some(download) = parser::video_download_url(&link.url, &self.config) {
                    resolved.push(MediaLink::new(link.kind, download));
                    continue;
                }
                if budget == 0 {
                    if !exhausted_logged {
                        log::debug!("Detail request budget used up; keeping viewer links");
                        exhausted_logged = true;
                    }
                    resolved.push(link.clone());
                    continue;
                }
                budget -= 1;

                match self.resolve_viewer(session, &link.url, set_cookies).await {
                    Resolved::Direct(url) => resolved.push(MediaLink::new(link.kind, url)),
                    Resolved::Failed(reason) => {
                        failure = Some(reason);
                        break;
                    }
                }
            }

            match failure {
                Some(reason) => {
                    log::warn!(
                        "Media for order {} not resolved ({}); sending without media",
                        fine.order_number,
                        reason
                    );
                    fine.media_links.clear();
                }
                None => fine.media_links = resolved,
            }
        }
    }

    async fn resolve_viewer(
        &self,
        session: &Session,
        viewer_url: &str,
        set_cookies: &mut Vec<String>,
    ) -> Resolved {
        let request = RegistryRequest::get(viewer_url)
            .with_cookies(session.cookie_header())
            .following_redirects();

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => return Resolved::Failed(e.to_string()),
        };
        if let Some(reason) = parser::detect_session_expiry(&response) {
            return Resolved::Failed(format!("session expired: {}", reason));
        }
        if !response.is_success() {
            return Resolved::Failed(format!("HTTP {} from {}", response.status, response.url));
        }
        set_cookies.extend(response.set_cookies.iter().cloned());
        if response.is_binary_media() {
            return Resolved::Direct(response.url);
        }
        match parser::parse_viewer_image(&response.body, &self.config) {
            Some(image) => Resolved::Direct(image),
            None => Resolved::Direct(viewer_url.to_string()),
        }
    }

    async fn dump_unparsable_page(&self, path: &Path, plate: &str, page: &str) {
        let separator = "=".repeat(80);
        let entry = format!(
            "\n{sep}\nTIMESTAMP: {}\nPLATE: {}\n{sep}\nHTML RESPONSE:\n{}\n{sep}\n\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
            plate,
            page,
            sep = separator
        );

        let written = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(entry.as_bytes()).await?;
            file.flush().await
        }
        .await;

        match written {
            Ok(()) => log::warn!("Listing for {} dumped to {}", plate, path.display()),
            Err(e) => log::error!("Could not dump listing to {}: {}", path.display(), e),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> FineFetcher for Scraper<T> {
    async fn fetch_fines(&self, session: &Session, plate: &str) -> Result<FineListing, ScrapeError> {
        let plate = plate.trim().to_uppercase();
        log::debug!("Fetching fines for {}", plate);

        let response = self.fetch_listing_page(session, &plate).await?;
        let page = response.body;

        let mut listing = match parser::parse_listing(&page, &plate, &self.config) {
            Ok(listing) => listing,
            Err(e) => {
                if let Some(path) = &self.config.parse_dump_file {
                    self.dump_unparsable_page(path, &plate, &page).await;
                }
                return Err(e);
            }
        };

        listing.set_cookies = response.set_cookies;
        self.resolve_media(session, &mut listing.fines, &mut listing.set_cookies)
            .await;

        log::debug!("{} fines listed for {}", listing.fines.len(), plate);
        Ok(listing)
    }
}
