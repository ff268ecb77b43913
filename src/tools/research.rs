use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{ArgShape, Tool, ToolRegistry};
use crate::action::ToolArgs;
use crate::backend::LanguageModel;

const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_WIKIPEDIA_URL: &str = "https://en.wikipedia.org/api/rest_v1";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) sami";
const PAGE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_SOURCE_CHARS: usize = 1500;

#[async_trait]
pub trait Research: Send + Sync {
    /// Search the web and answer `query` from the pages found.
    /// Quick mode reads a single page with fewer paragraphs.
    async fn search_and_summarize(&self, query: &str, quick: bool) -> String;

    async fn wikipedia_summary(&self, query: &str) -> String;
}

/// How much of the web to read per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadDepth {
    pub results: usize,
    pub paragraphs: usize,
}

impl ReadDepth {
    pub fn for_mode(quick: bool) -> Self {
        if quick {
            Self {
                results: 1,
                paragraphs: 5,
            }
        } else {
            Self {
                results: 3,
                paragraphs: 15,
            }
        }
    }
}

/// DuckDuckGo HTML search plus page scraping, summarized by a language model
pub struct WebResearcher {
    client: reqwest::Client,
    summarizer: Option<Arc<dyn LanguageModel>>,
    search_url: String,
    wikipedia_url: String,
}

impl WebResearcher {
    pub fn new(summarizer: Option<Arc<dyn LanguageModel>>) -> Self {
        Self::with_endpoints(summarizer, DEFAULT_SEARCH_URL, DEFAULT_WIKIPEDIA_URL)
    }

    pub fn with_endpoints(
        summarizer: Option<Arc<dyn LanguageModel>>,
        search_url: impl Into<String>,
        wikipedia_url: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(PAGE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            summarizer,
            search_url: search_url.into(),
            wikipedia_url: wikipedia_url.into(),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, reqwest::Error> {
        let html = self
            .client
            .post(&self.search_url)
            .form(&[("q", query)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_search_results(&html, limit))
    }

    async fn read_page(&self, url: &str, paragraphs: usize) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "failed to fetch page");
                return None;
            }
        };
        let html = response.text().await.ok()?;
        let text = extract_paragraphs(&html, paragraphs);
        (!text.is_empty()).then(|| truncate_chars(&text, MAX_SOURCE_CHARS))
    }
}

#[async_trait]
impl Research for WebResearcher {
    async fn search_and_summarize(&self, query: &str, quick: bool) -> String {
        let depth = ReadDepth::for_mode(quick);
        tracing::info!(query, quick, "researching");

        let urls = match self.search(query, depth.results).await {
            Ok(urls) => urls,
            Err(e) => return format!("Research failed during search: {e}"),
        };
        if urls.is_empty() {
            return "I couldn't find any relevant results on the web.".to_string();
        }

        let mut sources = String::new();
        for url in &urls {
            if let Some(text) = self.read_page(url, depth.paragraphs).await {
                sources.push_str(&format!("\nSOURCE: {url}\nCONTENT: {text}\n"));
            }
        }
        if sources.is_empty() {
            return "I found search results but couldn't read the content of the pages.".to_string();
        }

        let url_list = format!("Here are the top results I found:\n{}", urls.join("\n"));
        let Some(summarizer) = &self.summarizer else {
            return url_list;
        };

        let prompt = format!(
            "You are a Research Assistant. Summarize the following information to answer \
             the user's query: \"{query}\".\n\
             Format as a clear, concise report and answer the question directly.\n{sources}"
        );
        match summarizer.generate(&prompt).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "research summary failed, listing sources");
                url_list
            }
        }
    }

    async fn wikipedia_summary(&self, query: &str) -> String {
        let title = query.trim().replace(' ', "_");
        let url = format!(
            "{}/page/summary/{}",
            self.wikipedia_url.trim_end_matches('/'),
            urlencoding::encode(&title)
        );

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return format!("Wikipedia search failed: {e}"),
        };
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return "I couldn't find any page matching that request.".to_string();
        }

        match response.error_for_status() {
            Ok(response) => match response.json::<WikiSummary>().await {
                Ok(summary) if summary.kind == "disambiguation" => {
                    "There are multiple results for this topic. Please be more specific.".to_string()
                }
                Ok(summary) => format!("According to Wikipedia: {}", first_sentences(&summary.extract, 2)),
                Err(e) => format!("Wikipedia search failed: {e}"),
            },
            Err(e) => format!("Wikipedia search failed: {e}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WikiSummary {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    extract: String,
}

/// Unwrap DuckDuckGo's `/l/?uddg=` redirect links
fn extract_url(href: &str) -> Option<String> {
    let full = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&full).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full)
    }
}

/// Result URLs from a DuckDuckGo HTML page, ads skipped
pub fn parse_search_results(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(link_sel) = Selector::parse(".result:not(.result--ad) a.result__a") else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for link in document.select(&link_sel) {
        if let Some(url) = link.value().attr("href").and_then(extract_url) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        if urls.len() >= limit {
            break;
        }
    }
    urls
}

/// Text of the first `limit` non-empty `<p>` elements, space separated
pub fn extract_paragraphs(html: &str, limit: usize) -> String {
    let document = Html::parse_document(html);
    let Ok(p_sel) = Selector::parse("p") else {
        return String::new();
    };

    document
        .select(&p_sel)
        .map(|p| {
            p.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn first_sentences(text: &str, count: usize) -> String {
    let mut out = String::new();
    for (i, sentence) in text.split_inclusive(". ").enumerate() {
        if i == count {
            break;
        }
        out.push_str(sentence);
    }
    out.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResearchOp {
    Conduct,
    Wikipedia,
}

pub struct ResearchTool {
    op: ResearchOp,
    research: Arc<dyn Research>,
}

#[async_trait]
impl Tool for ResearchTool {
    fn name(&self) -> &str {
        match self.op {
            ResearchOp::Conduct => "conduct_research",
            ResearchOp::Wikipedia => "search_wikipedia",
        }
    }

    fn description(&self) -> &str {
        match self.op {
            ResearchOp::Conduct => "Read the web and summarize a complex or current topic",
            ResearchOp::Wikipedia => "Short encyclopedia summary of a topic",
        }
    }

    fn shape(&self) -> ArgShape {
        match self.op {
            ResearchOp::Conduct => ArgShape::new(&["topic"], &[]),
            ResearchOp::Wikipedia => ArgShape::new(&["query"], &[]),
        }
    }

    async fn execute(&self, args: &ToolArgs) -> String {
        let query = args.joined();
        match self.op {
            ResearchOp::Conduct => self.research.search_and_summarize(&query, false).await,
            ResearchOp::Wikipedia => self.research.wikipedia_summary(&query).await,
        }
    }
}

pub fn register(registry: &mut ToolRegistry, research: Arc<dyn Research>) {
    for op in [ResearchOp::Conduct, ResearchOp::Wikipedia] {
        registry.register(Arc::new(ResearchTool {
            op,
            research: research.clone(),
        }));
    }
}
