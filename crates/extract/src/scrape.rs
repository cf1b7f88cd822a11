use std::{net::IpAddr, time::Duration};

use {
    scraper::{Html, Selector},
    tracing::{debug, warn},
    url::Url,
};

use crate::{
    error::{Error, Result},
    shellout::clip_chars,
};

/// Fetches linked pages and keeps the text of their first paragraphs.
#[derive(Debug, Clone)]
pub struct PageScraper {
    timeout: Duration,
    max_paragraphs: usize,
    max_chars: usize,
    max_bytes: usize,
    max_redirects: u8,
    block_private_hosts: bool,
}

impl Default for PageScraper {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_paragraphs: 10,
            max_chars: 4_000,
            max_bytes: 2 * 1024 * 1024,
            max_redirects: 3,
            block_private_hosts: true,
        }
    }
}

impl PageScraper {
    pub fn from_config(config: &claimguard_config::ExtractConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.scrape_timeout_seconds),
            max_paragraphs: config.scrape_max_paragraphs,
            max_chars: config.scrape_max_chars,
            max_bytes: config.scrape_max_bytes,
            max_redirects: config.scrape_max_redirects,
            block_private_hosts: config.block_private_hosts,
        }
    }

    #[must_use]
    pub fn allow_private_hosts(mut self) -> Self {
        self.block_private_hosts = false;
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Paragraph text of the page at `url`, or an empty string on any failure.
    pub async fn scrape(&self, url: &str) -> String {
        match self.try_scrape(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url, error = %e, "page scrape failed");
                String::new()
            },
        }
    }

    async fn try_scrape(&self, url: &str) -> Result<String> {
        let mut current = Url::parse(url).map_err(|e| Error::external("invalid URL", e))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::external("failed to build HTTP client", e))?;

        let mut visited: Vec<Url> = Vec::new();
        let response = loop {
            // Every hop is checked, not just the link the user sent.
            self.check_target(&current).await?;
            visited.push(current.clone());

            let response = client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| Error::external("request failed", e))?;
            if !response.status().is_redirection() {
                break response
                    .error_for_status()
                    .map_err(|e| Error::external("bad status", e))?;
            }

            if visited.len() > usize::from(self.max_redirects) {
                return Err(Error::message(format!(
                    "too many redirects (max {})",
                    self.max_redirects
                )));
            }
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| Error::message("redirect without Location header"))?;
            let next = current
                .join(location)
                .map_err(|e| Error::external("invalid redirect target", e))?;
            if visited.contains(&next) {
                return Err(Error::message(format!("redirect loop at {next}")));
            }
            debug!(from = %current, to = %next, "following redirect");
            current = next;
        };

        let body = self.read_capped(response).await?;
        let text = first_paragraphs(&body, self.max_paragraphs);
        debug!(url = %current, chars = text.len(), "scraped page");
        Ok(clip_chars(&text, self.max_chars))
    }

    async fn check_target(&self, url: &Url) -> Result<()> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::message(format!("unsupported scheme: {}", url.scheme())));
        }
        if self.block_private_hosts {
            ssrf_check(url).await?;
        }
        Ok(())
    }

    /// Body text up to `max_bytes`; the rest of an oversized page is dropped,
    /// the leading paragraphs are all that is kept anyway.
    async fn read_capped(&self, mut response: reqwest::Response) -> Result<String> {
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::external("failed to read body", e))?
        {
            let room = self.max_bytes - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(limit = self.max_bytes, "page body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Text of the first `max` `<p>` elements, one per line.
pub fn first_paragraphs(html: &str, max: usize) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    let doc = Html::parse_document(html);
    doc.select(&selector)
        .take(max)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Refuse hosts that are, or resolve to, loopback/private/link-local
/// addresses.
async fn ssrf_check(url: &Url) -> Result<()> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::message("URL has no host"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(Error::message(format!("blocked private address {ip}")));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs: Vec<_> = tokio::net::lookup_host(format!("{host}:{port}"))
        .await
        .map_err(|e| Error::external(format!("DNS resolution failed for {host}"), e))?
        .collect();
    if addrs.is_empty() {
        return Err(Error::message(format!("DNS resolution failed for {host}")));
    }
    if let Some(addr) = addrs.iter().find(|a| is_private_ip(&a.ip())) {
        return Err(Error::message(format!(
            "blocked: {host} resolves to private address {}",
            addr.ip()
        )));
    }
    Ok(())
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10
                || (a == 100 && (b & 0xC0) == 64)
                || (a == 192 && b == 0 && c == 0)
        },
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFE00) == 0xFC00
                || (v6.segments()[0] & 0xFFC0) == 0xFE80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        },
    }
}
