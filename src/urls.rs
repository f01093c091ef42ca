//! HTTP checks of outbound links

use std::time::Duration;
use tracing::{debug, instrument};

use crate::{Error, Result};

/// Most redirects followed before a link counts as broken
const MAX_REDIRECTS: usize = 10;

/// Validates URLs by requesting them
#[derive(Debug, Clone)]
pub struct UrlChecker {
    following: reqwest::Client,
    direct: reqwest::Client,
}

impl UrlChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let build = |policy: reqwest::redirect::Policy| {
            reqwest::Client::builder()
                .timeout(timeout)
                .redirect(policy)
                .build()
                .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
        };

        Ok(Self {
            following: build(reqwest::redirect::Policy::limited(MAX_REDIRECTS))?,
            direct: build(reqwest::redirect::Policy::none())?,
        })
    }

    /// Request `url`; following redirects the final status must be 200, otherwise any 2xx or
    /// 3xx passes
    #[instrument(skip(self))]
    pub async fn assert_valid_url(&self, url: &str, follow_redirects: bool) -> Result<()> {
        let client = if follow_redirects { &self.following } else { &self.direct };
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::link_check(url, e.to_string()))?;

        let status = response.status();
        debug!("{} -> {} ({})", url, status, response.url());

        let valid = if follow_redirects {
            status == reqwest::StatusCode::OK
        } else {
            status.is_success() || status.is_redirection()
        };

        if !valid {
            return Err(Error::link_check(url, format!("status {}", status.as_u16())));
        }
        Ok(())
    }

    /// Request `url` without following redirects and check the status and, when given, the
    /// `Location` header
    #[instrument(skip(self))]
    pub async fn assert_redirect(&self, url: &str, status: u16, location: Option<&str>) -> Result<()> {
        let response = self
            .direct
            .get(url)
            .send()
            .await
            .map_err(|e| Error::link_check(url, e.to_string()))?;

        let observed = response.status().as_u16();
        if observed != status {
            return Err(Error::link_check(
                url,
                format!("expected status {}, observed {}", status, observed),
            ));
        }

        if let Some(expected) = location {
            let actual = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if actual != expected {
                return Err(Error::link_check(
                    url,
                    format!("expected Location {}, observed {}", expected, actual),
                ));
            }
        }
        Ok(())
    }
}

/// Swap the `from` origin of `link` for `to`
///
/// Result links carry the public host (`http://localhost:8000`) even when the suite reaches
/// the site under another name.
pub fn substitute_host(link: &str, from: &str, to: &str) -> String {
    let from = from.trim_end_matches('/');
    let to = to.trim_end_matches('/');
    match link.strip_prefix(from) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') => {
            format!("{}{}", to, rest)
        }
        _ => link.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> UrlChecker {
        UrlChecker::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_substitute_host() {
        assert_eq!(
            substitute_host("http://localhost:8000/en-US/docs/Web/CSS", "http://localhost:8000", "http://web:8000/"),
            "http://web:8000/en-US/docs/Web/CSS"
        );
        assert_eq!(
            substitute_host("https://developer.mozilla.org/en-US/", "http://localhost:8000", "http://web:8000"),
            "https://developer.mozilla.org/en-US/"
        );
        assert_eq!(
            substitute_host("http://localhost:80001/x", "http://localhost:8000", "http://web:8000"),
            "http://localhost:80001/x"
        );
    }

    #[tokio::test]
    async fn test_valid_url_follows_redirects() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/en-US/docs/CSS")
            .with_status(301)
            .with_header("location", "/en-US/docs/Web/CSS")
            .create_async()
            .await;
        server
            .mock("GET", "/en-US/docs/Web/CSS")
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let url = format!("{}/en-US/docs/CSS", server.url());
        checker().assert_valid_url(&url, true).await.unwrap();
        checker().assert_valid_url(&url, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_broken_link_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/en-US/docs/Missing").with_status(404).create_async().await;

        let url = format!("{}/en-US/docs/Missing", server.url());
        let err = checker().assert_valid_url(&url, true).await.unwrap_err();
        assert!(matches!(err, Error::LinkCheck { detail, .. } if detail == "status 404"));
    }

    #[tokio::test]
    async fn test_assert_redirect() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/docs")
            .with_status(302)
            .with_header("location", "/en-US/docs/Web")
            .create_async()
            .await;

        let url = format!("{}/docs", server.url());
        checker().assert_redirect(&url, 302, Some("/en-US/docs/Web")).await.unwrap();
        assert!(checker().assert_redirect(&url, 301, None).await.is_err());
        assert!(checker().assert_redirect(&url, 302, Some("/fr/docs/Web")).await.is_err());
    }
}
