//! Article fetching and readable-text extraction.

use std::time::Duration;

use reqwest::blocking::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{PodcastError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (podcastify)";

/// Readable content of a web article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub text: String,
}

/// Contract for article sources.
pub trait ArticleSource: Send + Sync {
    /// # Errors
    /// `Scrape` on fetch or extraction failure.
    fn fetch(&self, url: &str) -> Result<Article>;
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

pub struct HttpArticleFetcher {
    http: Client,
}

impl HttpArticleFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| PodcastError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }
}

impl ArticleSource for HttpArticleFetcher {
    fn fetch(&self, url: &str) -> Result<Article> {
        let parsed = validate_url(url)?;
        let response = self
            .http
            .get(parsed.clone())
            .send()
            .map_err(|e| PodcastError::Scrape(format!("fetch failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url, "article fetch returned non-success status");
            return Err(PodcastError::Scrape(format!("{url} returned {status}")));
        }
        let html = response
            .text()
            .map_err(|e| PodcastError::Scrape(format!("body read failed: {e}")))?;
        debug!(bytes = html.len(), "article html fetched");
        extract_article(&html, &parsed)
    }
}

/// Only absolute http(s) URLs with a host are fetched.
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| PodcastError::Scrape(format!("invalid url {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(PodcastError::Scrape(format!(
            "unsupported url {raw:?}: expected http(s) with a host"
        )));
    }
    Ok(url)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| PodcastError::Scrape(format!("selector {css}: {e}")))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull a title and the body paragraphs out of an HTML document.
///
/// Title preference: `og:title`, then `<title>`, then the URL host.
/// Paragraphs come from `<article>`, else `<main>`, else the whole page.
pub fn extract_article(html: &str, url: &Url) -> Result<Article> {
    let doc = Html::parse_document(html);

    let og_title = selector(r#"meta[property="og:title"]"#)?;
    let title_tag = selector("title")?;
    let title = doc
        .select(&og_title)
        .find_map(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            doc.select(&title_tag)
                .next()
                .map(|t| collapse_whitespace(&t.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        })
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());

    let mut text = String::new();
    for scope in ["article p", "main p", "p"] {
        let sel = selector(scope)?;
        let paragraphs: Vec<String> = doc
            .select(&sel)
            .map(|p| collapse_whitespace(&p.text().collect::<String>()))
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            text = paragraphs.join("\n\n");
            break;
        }
    }

    if text.is_empty() {
        return Err(PodcastError::Scrape(format!(
            "no readable text found at {url}"
        )));
    }
    Ok(Article { title, text })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://news.example.com/story").unwrap()
    }

    #[test]
    fn prefers_og_title_and_article_paragraphs() {
        let html = r#"<html><head>
            <title>Site | Story</title>
            <meta property="og:title" content="  The   Story ">
        </head><body>
            <p>Cookie banner</p>
            <article><p>First   para.</p><p>
            Second para.</p></article>
        </body></html>"#;
        let article = extract_article(html, &url()).expect("extract");
        assert_eq!(article.title, "The Story");
        assert_eq!(article.text, "First para.\n\nSecond para.");
    }

    #[test]
    fn falls_back_to_title_tag_and_page_paragraphs() {
        let html = "<html><head><title>Plain</title></head><body><p>Only text.</p></body></html>";
        let article = extract_article(html, &url()).expect("extract");
        assert_eq!(article.title, "Plain");
        assert_eq!(article.text, "Only text.");
    }

    #[test]
    fn host_is_last_resort_title() {
        let html = "<html><body><main><p>Body.</p></main></body></html>";
        let article = extract_article(html, &url()).expect("extract");
        assert_eq!(article.title, "news.example.com");
    }

    #[test]
    fn empty_page_is_scrape_error() {
        let err = extract_article("<html><body></body></html>", &url()).unwrap_err();
        assert!(matches!(err, PodcastError::Scrape(_)));
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("ftp://example.com/a").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn fetches_over_http() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/post")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_body("<title>T</title><p>Hello world.</p>")
            .create();
        let fetcher = HttpArticleFetcher::new(FetcherConfig::default()).unwrap();
        let article = fetcher.fetch(&format!("{}/post", server.url())).expect("fetch");
        assert_eq!(article, Article { title: "T".into(), text: "Hello world.".into() });

        let _missing = server.mock("GET", "/gone").with_status(404).create();
        let err = fetcher.fetch(&format!("{}/gone", server.url())).unwrap_err();
        assert!(matches!(err, PodcastError::Scrape(_)));
    }
}
