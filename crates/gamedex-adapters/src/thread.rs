//! Field extraction for XenForo-style forum thread pages.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use gamedex_core::{FieldMap, GameEngine, GameRender, GameStatus};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::{AdapterDescriptor, AdapterError, Page, PageSource, SiteAdapter};

const ENGINE_LABELS: &[(&str, GameEngine)] = &[
    ("Adrift", GameEngine::Adrift),
    ("Flash", GameEngine::Flash),
    ("HTML", GameEngine::Html),
    ("JAVA", GameEngine::Java),
    ("QSP", GameEngine::Qsp),
    ("RAGS", GameEngine::Rags),
    ("RenPy", GameEngine::RenPy),
    ("Ren'Py", GameEngine::RenPy),
    ("RPGM", GameEngine::Rpgm),
    ("TADS", GameEngine::Tads),
    ("Unity", GameEngine::Unity),
    ("Unreal", GameEngine::Unreal),
    ("Unreal Engine", GameEngine::Unreal),
    ("WebGL", GameEngine::WebGl),
    ("Wolf RPG", GameEngine::WolfRpg),
];

const RENDER_LABELS: &[(&str, GameRender)] = &[
    ("AI", GameRender::Ai),
    ("DAZ", GameRender::Daz),
    ("Hand Drawn", GameRender::HandDrawn),
    ("HS", GameRender::HoneySelect),
    ("HS2", GameRender::HoneySelect2),
    ("Koikatsu", GameRender::Koikatsu),
    ("TK17", GameRender::Tk17),
    ("VAM", GameRender::Vam),
];

const STATUS_LABELS: &[(&str, GameStatus)] = &[
    ("Completed", GameStatus::Completed),
    ("Abandoned", GameStatus::Abandoned),
    ("Onhold", GameStatus::OnHold),
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Adapter for forums sharing the XenForo thread layout.
pub struct ThreadPageAdapter {
    descriptor: AdapterDescriptor,
    pages: Arc<dyn PageSource>,
}

impl ThreadPageAdapter {
    pub fn new(descriptor: AdapterDescriptor, pages: Arc<dyn PageSource>) -> Self {
        Self { descriptor, pages }
    }
}

#[async_trait]
impl SiteAdapter for ThreadPageAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<Option<FieldMap>, AdapterError> {
        let page = self.pages.fetch_page(url).await?;
        if page.html.trim().is_empty() {
            return Ok(None);
        }
        extract_thread_fields(&self.descriptor, &page)
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Message(e.to_string()))
}

fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_value(raw: &str) -> String {
    raw.replace(':', " ").trim().to_string()
}

fn label_matches(text: &str, label: &str) -> bool {
    let text = text.trim().to_lowercase();
    let label = label.to_lowercase();
    text == label || text == format!("[{label}]")
}

/// Parses the loose date formats forum posts use into `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Drops the trailing `[version] [developer]` decoration of a thread headline.
fn strip_trailing_brackets(title: &str) -> &str {
    let trimmed = title.trim_end();
    if trimmed.ends_with(']') {
        if let Some(idx) = trimmed.find('[') {
            return trimmed[..idx].trim_end();
        }
    }
    trimmed
}

fn clean_title(headline: ElementRef<'_>, labels: &Selector) -> String {
    let raw = joined_text(headline);
    let mut title = strip_trailing_brackets(&raw).to_string();
    for label in headline.select(labels) {
        let label_text = joined_text(label);
        if !label_text.is_empty() && title.contains(&label_text) {
            title = title.replacen(&label_text, "", 1).trim().to_string();
        }
    }
    title
}

fn headline_labels(headline: ElementRef<'_>, spans: &Selector) -> Vec<String> {
    headline.select(spans).map(joined_text).collect()
}

fn first_label_match<T: Copy>(labels: &[String], table: &[(&str, T)], default: T) -> T {
    table
        .iter()
        .find(|(text, _)| labels.iter().any(|label| label_matches(label, text)))
        .map(|(_, value)| *value)
        .unwrap_or(default)
}

/// Text following a `<b>label</b>` marker, or the first link right after it.
fn labelled_value(article: ElementRef<'_>, bold: &Selector, label: &str) -> Option<String> {
    let marker = article
        .select(bold)
        .find(|b| joined_text(*b).trim_end_matches(':') == label)?;

    for sibling in marker.next_siblings() {
        if let Some(text) = sibling.value().as_text() {
            let value = clean_value(text);
            if value.is_empty() {
                continue;
            }
            return Some(value);
        }
        if let Some(element) = ElementRef::wrap(sibling) {
            if element.value().name() == "a" {
                let value = joined_text(element);
                return (!value.is_empty()).then_some(value);
            }
            return None;
        }
    }
    None
}

fn comma_list(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .map(Value::String)
        .collect()
}

/// Genre spoiler block listed by the uploader below the `<b>Genre</b>` marker.
fn genre_tags(article: ElementRef<'_>, bold: &Selector, content: &Selector) -> Vec<String> {
    let Some(marker) = article.select(bold).find(|b| joined_text(*b) == "Genre") else {
        return Vec::new();
    };
    let spoiler = marker
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && el.value().classes().any(|c| c == "bbCodeSpoiler"));
    spoiler
        .and_then(|div| div.select(content).next())
        .map(|div| {
            div.text()
                .collect::<String>()
                .split(',')
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts the thread fields. `Ok(None)` when the page has no thread body.
pub fn extract_thread_fields(
    descriptor: &AdapterDescriptor,
    page: &Page,
) -> Result<Option<FieldMap>, AdapterError> {
    let document = Html::parse_document(&page.html);
    let article_sel = selector("article.message-body")?;
    let Some(article) = document.select(&article_sel).next() else {
        return Ok(None);
    };

    let bold = selector("b")?;
    let mut fields = FieldMap::new();
    fields.insert("url".into(), Value::String(page.final_url.clone()));
    fields.insert("source".into(), Value::String(descriptor.name.to_string()));

    if let Some(headline) = document.select(&selector("h1.p-title-value")?).next() {
        let title = clean_title(headline, &selector("a, span")?);
        if !title.is_empty() {
            fields.insert("title".into(), Value::String(title));
        }
    }

    if let Some(published) = labelled_value(article, &bold, "Release Date").and_then(|v| normalize_date(&v)) {
        fields.insert("published".into(), Value::String(published));
    }
    if let Some(updated) = labelled_value(article, &bold, "Thread Updated").and_then(|v| normalize_date(&v)) {
        fields.insert("updated".into(), Value::String(updated));
    }
    if let Some(developer) = labelled_value(article, &bold, "Developer") {
        fields.insert("developer".into(), Value::String(developer));
    }
    if let Some(version) = labelled_value(article, &bold, "Version") {
        fields.insert("last_version".into(), Value::String(version));
    }
    if let Some(os) = labelled_value(article, &bold, "OS") {
        fields.insert("os".into(), Value::Array(comma_list(&os)));
    }
    if let Some(language) = labelled_value(article, &bold, "Language") {
        fields.insert("language".into(), Value::Array(comma_list(&language)));
    }

    if let Some(canonical) = document
        .select(&selector("link[rel=\"canonical\"]")?)
        .next()
        .and_then(|link| link.value().attr("href"))
    {
        fields.insert("url".into(), Value::String(canonical.to_string()));
    }
    if let Some(description) = document
        .select(&selector("meta[property=\"twitter:description\"]")?)
        .next()
        .and_then(|meta| meta.value().attr("content"))
    {
        fields.insert("description".into(), Value::String(description.to_string()));
    }

    let spans = selector("span")?;
    let labels = document
        .select(&selector("h1")?)
        .next()
        .map(|h1| headline_labels(h1, &spans))
        .unwrap_or_default();
    let status = first_label_match(&labels, STATUS_LABELS, GameStatus::Unknown);
    let engine = first_label_match(&labels, ENGINE_LABELS, GameEngine::Unknown);
    let render = first_label_match(&labels, RENDER_LABELS, GameRender::Unknown);
    fields.insert("status".into(), Value::String(status.as_str().to_string()));
    fields.insert("game_engine".into(), Value::String(engine.as_str().to_string()));
    fields.insert("game_render".into(), Value::String(render.as_str().to_string()));

    let mut tags: Vec<String> = document
        .select(&selector("a.tagItem")?)
        .map(|tag| joined_text(tag).to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.extend(genre_tags(article, &bold, &selector("div.bbCodeBlock-content")?));
    tags.sort();
    fields.insert(
        "tags".into(),
        Value::Array(tags.into_iter().map(Value::String).collect()),
    );

    Ok(Some(fields))
}
