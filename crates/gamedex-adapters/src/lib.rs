//! Site adapter contracts, URL resolution and the built-in adapter registry.


use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use gamedex_core::FieldMap;
use gamedex_storage::{FetchError, HttpFetcher};
use thiserror::Error;
use url::Url;

mod thread;

pub use thread::{extract_thread_fields, normalize_date, ThreadPageAdapter};

pub const CRATE_NAME: &str = "gamedex-adapters";

/// Static metadata an adapter advertises for URL matching and manual selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterDescriptor {
    pub name: &'static str,
    pub domain: &'static str,
    pub suffix: &'static str,
    pub subdomain: Option<&'static str>,
    /// When non-empty, at least one entry must be a substring of the URL.
    pub paths: &'static [&'static str],
}

impl AdapterDescriptor {
    pub const fn new(name: &'static str, domain: &'static str, suffix: &'static str) -> Self {
        Self {
            name,
            domain,
            suffix,
            subdomain: None,
            paths: &[],
        }
    }

    pub const fn with_subdomain(mut self, subdomain: &'static str) -> Self {
        self.subdomain = Some(subdomain);
        self
    }

    pub const fn with_paths(mut self, paths: &'static [&'static str]) -> Self {
        self.paths = paths;
        self
    }

    pub fn matches(&self, parts: &UrlParts, url: &str) -> bool {
        if parts.domain != self.domain || parts.suffix != self.suffix {
            return false;
        }
        if let Some(subdomain) = self.subdomain {
            if !subdomain.is_empty() && parts.subdomain != subdomain {
                return false;
            }
        }
        if !self.paths.is_empty() && !self.paths.iter().any(|path| url.contains(path)) {
            return false;
        }
        true
    }
}

/// A URL host split into subdomain, registrable domain label and public suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
}

impl UrlParts {
    /// `None` when the URL does not parse or carries no host.
    pub fn parse(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed
            .host_str()?
            .trim_end_matches('.')
            .to_ascii_lowercase();
        let suffix = psl::suffix_str(&host)?.to_string();

        let Some(rest) = host
            .strip_suffix(suffix.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
        else {
            return Some(Self {
                subdomain: String::new(),
                domain: String::new(),
                suffix,
            });
        };

        let (subdomain, domain) = match rest.rsplit_once('.') {
            Some((subdomain, domain)) => (subdomain.to_string(), domain.to_string()),
            None => (String::new(), rest.to_string()),
        };
        Some(Self {
            subdomain,
            domain,
            suffix,
        })
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A site-specific capability turning a URL into a flat field map.
///
/// `Ok(None)` means the adapter ran but found nothing usable on the page.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn descriptor(&self) -> &AdapterDescriptor;

    async fn fetch_and_extract(&self, url: &str) -> Result<Option<FieldMap>, AdapterError>;
}

/// Fetched document handed to extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub final_url: String,
    pub html: String,
}

/// Page retrieval collaborator used by extracting adapters.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<Page, AdapterError>;
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<Page, AdapterError> {
        let fetched = self.fetch_text(url).await?;
        Ok(Page {
            final_url: fetched.final_url,
            html: fetched.body,
        })
    }
}

/// Registered site without an extractor; always reports no data.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorOnlyAdapter {
    descriptor: AdapterDescriptor,
}

impl DescriptorOnlyAdapter {
    pub fn new(descriptor: AdapterDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl SiteAdapter for DescriptorOnlyAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    async fn fetch_and_extract(&self, _url: &str) -> Result<Option<FieldMap>, AdapterError> {
        Ok(None)
    }
}

/// Ordered adapter registry. The first registered adapter that matches a URL wins.
#[derive(Clone, Default)]
pub struct Resolver {
    adapters: Vec<Arc<dyn SiteAdapter>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.descriptor().name))
            .finish()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<A: SiteAdapter + 'static>(&mut self, adapter: A) -> &mut Self {
        self.adapters.push(Arc::new(adapter));
        self
    }

    pub fn register_shared(&mut self, adapter: Arc<dyn SiteAdapter>) -> &mut Self {
        self.adapters.push(adapter);
        self
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &AdapterDescriptor> {
        self.adapters.iter().map(|a| a.descriptor())
    }

    pub fn resolve_by_url(&self, url: &str) -> Option<&dyn SiteAdapter> {
        let parts = UrlParts::parse(url)?;
        self.adapters
            .iter()
            .find(|a| a.descriptor().matches(&parts, url))
            .map(|a| a.as_ref())
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<&dyn SiteAdapter> {
        self.adapters
            .iter()
            .find(|a| a.descriptor().name == name)
            .map(|a| a.as_ref())
    }

    /// An explicit adapter name takes precedence over URL matching.
    pub fn resolve(&self, url: &str, adapter_name: Option<&str>) -> Option<&dyn SiteAdapter> {
        match adapter_name {
            Some(name) if !name.is_empty() => self.resolve_by_name(name),
            _ if !url.is_empty() => self.resolve_by_url(url),
            _ => None,
        }
    }
}

pub const ALLTHEFALLEN: AdapterDescriptor = AdapterDescriptor::new("AllTheFallen", "allthefallen", "moe");
pub const F95ZONE: AdapterDescriptor = AdapterDescriptor::new("F95zone", "f95zone", "to");
/// Resolvable but registered without an extractor, so it never returns data.
pub const FAPNATION: AdapterDescriptor = AdapterDescriptor::new("FapNation", "fap-nation", "com");
pub const LEWDCORNER: AdapterDescriptor = AdapterDescriptor::new("LewdCorner", "lewdcorner", "com");
pub const RORIWALRUS: AdapterDescriptor = AdapterDescriptor::new("Roriwalrus", "roriwalrus", "com");

/// Registry of the built-in sites in their canonical registration order.
///
/// FapNation is descriptor-only: URLs on it resolve, but every fetch reports no
/// data. The other four sites use the thread-page extractor.
pub fn default_resolver(pages: Arc<dyn PageSource>) -> Resolver {
    let mut resolver = Resolver::new();
    resolver
        .register(ThreadPageAdapter::new(ALLTHEFALLEN, pages.clone()))
        .register(ThreadPageAdapter::new(F95ZONE, pages.clone()))
        .register(DescriptorOnlyAdapter::new(FAPNATION))
        .register(ThreadPageAdapter::new(LEWDCORNER, pages.clone()))
        .register(ThreadPageAdapter::new(RORIWALRUS, pages));
    resolver
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_parts_split_subdomain_domain_suffix() {
        let parts = UrlParts::parse("https://www.f95zone.to/threads/x.1/").unwrap();
        assert_eq!(parts.subdomain, "www");
        assert_eq!(parts.domain, "f95zone");
        assert_eq!(parts.suffix, "to");

        let parts = UrlParts::parse("https://a.b.example.co.uk/page").unwrap();
        assert_eq!(parts.subdomain, "a.b");
        assert_eq!(parts.domain, "example");
        assert_eq!(parts.suffix, "co.uk");
    }

    #[test]
    fn unparsable_url_has_no_parts() {
        assert!(UrlParts::parse("not a url").is_none());
        assert!(UrlParts::parse("").is_none());
    }

    #[test]
    fn descriptor_requires_declared_subdomain_and_paths() {
        const FORUM: AdapterDescriptor = AdapterDescriptor::new("Forum", "example", "com")
            .with_subdomain("forum")
            .with_paths(&["/threads/"]);
        let url = "https://forum.example.com/threads/1";
        assert!(FORUM.matches(&UrlParts::parse(url).unwrap(), url));

        let url = "https://www.example.com/threads/1";
        assert!(!FORUM.matches(&UrlParts::parse(url).unwrap(), url));

        let url = "https://forum.example.com/members/1";
        assert!(!FORUM.matches(&UrlParts::parse(url).unwrap(), url));
    }

    #[test]
    fn explicit_name_bypasses_url_matching() {
        let mut resolver = Resolver::new();
        resolver
            .register(DescriptorOnlyAdapter::new(F95ZONE))
            .register(DescriptorOnlyAdapter::new(FAPNATION));

        let picked = resolver
            .resolve("https://f95zone.to/threads/x", Some("FapNation"))
            .unwrap();
        assert_eq!(picked.descriptor().name, "FapNation");
        assert!(resolver.resolve("", None).is_none());
        assert!(resolver.resolve_by_name("Dikgames").is_none());
    }
}
