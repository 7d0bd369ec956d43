//! Sitemaps and robots.txt
//!
//! One sitemap per public section. Each lists the documents an anonymous
//! visitor may read, as `{loc, lastmod}` pairs, and is cached under the
//! section's tag until a write to that collection revalidates it.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::access::{Collection, Operation};
use crate::cache::{tag_key, CacheLayer, SharedCache};
use crate::config::SiteConfig;
use crate::db::repositories::{ContentRepository, PropertyRepository};
use crate::models::{ContentKind, SitemapRecord};

/// Cache key of the entry list inside a section's tag
const ENTRIES_KEY: &str = "entries";

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// A public section with its own sitemap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitemapSection {
    Categories,
    Faqs,
    KnowledgeBase,
    Properties,
}

impl SitemapSection {
    pub const ALL: [SitemapSection; 4] = [
        SitemapSection::Categories,
        SitemapSection::Faqs,
        SitemapSection::KnowledgeBase,
        SitemapSection::Properties,
    ];

    /// URL path segment of the section's documents
    pub fn path(&self) -> &'static str {
        match self {
            SitemapSection::Categories => "categories",
            SitemapSection::Faqs => "faqs",
            SitemapSection::KnowledgeBase => "knowledge-base",
            SitemapSection::Properties => "properties",
        }
    }

    /// Cache tag
    pub fn tag(&self) -> &'static str {
        match self {
            SitemapSection::Categories => "categories-sitemap",
            SitemapSection::Faqs => "faqs-sitemap",
            SitemapSection::KnowledgeBase => "knowledge-base-sitemap",
            SitemapSection::Properties => "properties-sitemap",
        }
    }

    /// Route the sitemap is served from
    pub fn route(&self) -> String {
        format!("/{}.xml", self.tag())
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.tag() == tag)
    }

    pub fn collection(&self) -> Collection {
        match self {
            SitemapSection::Categories => Collection::Categories,
            SitemapSection::Faqs => Collection::Faqs,
            SitemapSection::KnowledgeBase => Collection::KnowledgeBase,
            SitemapSection::Properties => Collection::Properties,
        }
    }
}

impl From<ContentKind> for SitemapSection {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Category => SitemapSection::Categories,
            ContentKind::Faq => SitemapSection::Faqs,
            ContentKind::KnowledgeBase => SitemapSection::KnowledgeBase,
        }
    }
}

/// One `<url>` of a sitemap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: DateTime<Utc>,
}

/// Map records to entries, dropping records without a usable slug.
///
/// Records never modified get `now` as their `lastmod`.
pub fn build_entries(
    base_url: &str,
    section: SitemapSection,
    records: Vec<SitemapRecord>,
    now: DateTime<Utc>,
) -> Vec<SitemapEntry> {
    records
        .into_iter()
        .filter_map(|record| {
            let slug = record.slug?;
            let slug = slug.trim();
            if slug.is_empty() {
                return None;
            }
            Some(SitemapEntry {
                loc: format!("{}/{}/{}", base_url, section.path(), slug),
                lastmod: record.updated_at.unwrap_or(now),
            })
        })
        .collect()
}

/// Escape text for XML element content
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_lastmod(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render a `<urlset>` document
pub fn render_urlset(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(xml, "<urlset xmlns=\"{}\">", SITEMAP_NS);
    for entry in entries {
        let _ = writeln!(
            xml,
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n  </url>",
            escape_xml(&entry.loc),
            format_lastmod(&entry.lastmod)
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Render a `<sitemapindex>` document pointing at `locations`
pub fn render_index(locations: &[String]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(xml, "<sitemapindex xmlns=\"{}\">", SITEMAP_NS);
    for loc in locations {
        let _ = writeln!(
            xml,
            "  <sitemap>\n    <loc>{}</loc>\n  </sitemap>",
            escape_xml(loc)
        );
    }
    xml.push_str("</sitemapindex>\n");
    xml
}

/// Make a configured sitemap reference absolute against the site URL
fn absolute(base_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else {
        format!("{}/{}", base_url, location.trim_start_matches('/'))
    }
}

/// Render robots.txt
pub fn render_robots(base_url: &str, site: &SiteConfig) -> String {
    let mut robots = String::from("User-agent: *\nAllow: /\n");
    for path in &site.excluded_paths {
        let _ = writeln!(robots, "Disallow: {}", path);
    }
    robots.push('\n');
    let _ = writeln!(robots, "Sitemap: {}/sitemap.xml", base_url);
    for extra in &site.additional_sitemaps {
        let _ = writeln!(robots, "Sitemap: {}", absolute(base_url, extra));
    }
    robots
}

/// Sitemap service
pub struct SitemapService {
    properties: Arc<dyn PropertyRepository>,
    content: Arc<dyn ContentRepository>,
    cache: SharedCache,
    site: SiteConfig,
    base_url: String,
}

impl SitemapService {
    pub fn new(
        properties: Arc<dyn PropertyRepository>,
        content: Arc<dyn ContentRepository>,
        cache: SharedCache,
        site: SiteConfig,
    ) -> Self {
        let base_url = site.base_url();
        Self {
            properties,
            content,
            cache,
            site,
            base_url,
        }
    }

    /// Canonical site URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Entries of a section, served from cache when the tag is still valid
    pub async fn entries(&self, section: SitemapSection) -> Result<Vec<SitemapEntry>> {
        let tag = section.tag();
        // Taken before loading so a write during the load discards this fill
        let generation = self.cache.generation(tag);
        let key = tag_key(tag, generation, ENTRIES_KEY);
        if let Some(cached) = self.cache.get::<Vec<SitemapEntry>>(&key).await? {
            return Ok(cached);
        }

        let records = self.load_records(section).await?;
        let entries = build_entries(&self.base_url, section, records, Utc::now());
        let stored = self
            .cache
            .set_tagged_at(tag, generation, ENTRIES_KEY, &entries)
            .await?;

        tracing::debug!(tag, count = entries.len(), stored, "Built sitemap");
        Ok(entries)
    }

    /// Sitemap XML of a section
    pub async fn render(&self, section: SitemapSection) -> Result<String> {
        Ok(render_urlset(&self.entries(section).await?))
    }

    /// Sitemap index covering every section plus the configured extras
    pub fn index(&self) -> String {
        let mut locations: Vec<String> = SitemapSection::ALL
            .iter()
            .map(|s| format!("{}{}", self.base_url, s.route()))
            .collect();
        locations.extend(
            self.site
                .additional_sitemaps
                .iter()
                .map(|extra| absolute(&self.base_url, extra)),
        );
        render_index(&locations)
    }

    pub fn robots(&self) -> String {
        render_robots(&self.base_url, &self.site)
    }

    /// Drop the cached entries of a section
    pub async fn revalidate(&self, section: SitemapSection) -> Result<()> {
        self.cache.revalidate_tag(section.tag()).await?;
        Ok(())
    }

    /// Records an anonymous visitor may read, selected by the collection's
    /// own read access
    async fn load_records(&self, section: SitemapSection) -> Result<Vec<SitemapRecord>> {
        let Some(filter) = section.collection().access(Operation::Read, None).filter() else {
            return Ok(Vec::new());
        };

        match section {
            SitemapSection::Properties => self.properties.sitemap_records(&filter).await,
            SitemapSection::Categories => {
                self.content.sitemap_records(ContentKind::Category, &filter).await
            }
            SitemapSection::Faqs => self.content.sitemap_records(ContentKind::Faq, &filter).await,
            SitemapSection::KnowledgeBase => {
                self.content
                    .sitemap_records(ContentKind::KnowledgeBase, &filter)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Where;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        ContentRepository, SqlxContentRepository, SqlxPropertyRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ContentEntry, ListParams, Property};
    use chrono::TimeZone;

    fn record(slug: Option<&str>, updated_at: Option<DateTime<Utc>>) -> SitemapRecord {
        SitemapRecord {
            slug: slug.map(str::to_string),
            updated_at,
        }
    }

    #[test]
    fn test_build_entries_filters_and_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let edited = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let records = vec![
            record(Some("first"), Some(edited)),
            record(Some(""), Some(edited)),
            record(None, None),
            record(Some("   "), None),
            record(Some("second"), None),
        ];

        let entries = build_entries("https://example.com", SitemapSection::Faqs, records, now);
        assert_eq!(
            entries,
            vec![
                SitemapEntry {
                    loc: "https://example.com/faqs/first".to_string(),
                    lastmod: edited,
                },
                SitemapEntry {
                    loc: "https://example.com/faqs/second".to_string(),
                    lastmod: now,
                },
            ]
        );
    }

    #[test]
    fn test_render_urlset_escapes() {
        let lastmod = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let xml = render_urlset(&[SitemapEntry {
            loc: "https://example.com/properties/a&b".to_string(),
            lastmod,
        }]);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<loc>https://example.com/properties/a&amp;b</loc>"));
        assert!(xml.contains("<lastmod>2024-01-02T03:04:05Z</lastmod>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn test_render_robots() {
        let site = SiteConfig {
            url: None,
            excluded_paths: vec!["/admin".into(), "/api".into()],
            additional_sitemaps: vec!["/pages-sitemap.xml".into()],
        };
        let robots = render_robots("https://example.com", &site);
        assert!(robots.starts_with("User-agent: *\nAllow: /\n"));
        assert!(robots.contains("Disallow: /admin\n"));
        assert!(robots.contains("Disallow: /api\n"));
        assert!(robots.contains("Sitemap: https://example.com/sitemap.xml\n"));
        assert!(robots.contains("Sitemap: https://example.com/pages-sitemap.xml\n"));
    }

    #[test]
    fn test_section_tags() {
        for section in SitemapSection::ALL {
            assert_eq!(SitemapSection::from_tag(section.tag()), Some(section));
            assert_eq!(section.route(), format!("/{}-sitemap.xml", section.path()));
        }
        assert_eq!(SitemapSection::from_tag("pages-sitemap"), None);
    }

    async fn setup() -> (SitemapService, Arc<dyn ContentRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let content = SqlxContentRepository::boxed(pool.clone());
        let site = SiteConfig {
            url: Some("https://homes.example/".to_string()),
            ..SiteConfig::default()
        };
        let service = SitemapService::new(
            SqlxPropertyRepository::boxed(pool),
            content.clone(),
            create_cache(&CacheConfig::default()),
            site,
        );
        (service, content)
    }

    fn faq(slug: &str, published: bool) -> ContentEntry {
        ContentEntry {
            id: 0,
            title: "Q?".to_string(),
            slug: slug.to_string(),
            body: "A.".to_string(),
            published,
            is_draft: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_entries_cached_until_revalidated() {
        let (service, content) = setup().await;
        content.create(ContentKind::Faq, &faq("one", true)).await.unwrap();
        content.create(ContentKind::Faq, &faq("hidden", false)).await.unwrap();

        let entries = service.entries(SitemapSection::Faqs).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].loc, "https://homes.example/faqs/one");

        content.create(ContentKind::Faq, &faq("two", true)).await.unwrap();
        let cached = service.entries(SitemapSection::Faqs).await.unwrap();
        assert_eq!(cached, entries);

        service.revalidate(SitemapSection::Faqs).await.unwrap();
        let fresh = service.entries(SitemapSection::Faqs).await.unwrap();
        assert_eq!(fresh.len(), 2);
    }

    /// Listings repository that reports a write landing mid-load on its
    /// first sitemap query
    struct WriteDuringLoad {
        inner: Arc<dyn PropertyRepository>,
        cache: SharedCache,
        loads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PropertyRepository for WriteDuringLoad {
        async fn create(&self, property: &Property) -> Result<Property> {
            self.inner.create(property).await
        }

        async fn find(&self, id: i64, filter: &Where) -> Result<Option<Property>> {
            self.inner.find(id, filter).await
        }

        async fn list(&self, filter: &Where, params: &ListParams) -> Result<(Vec<Property>, i64)> {
            self.inner.list(filter, params).await
        }

        async fn update(&self, property: &Property) -> Result<Property> {
            self.inner.update(property).await
        }

        async fn delete(&self, id: i64, filter: &Where) -> Result<bool> {
            self.inner.delete(id, filter).await
        }

        async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
            self.inner.slug_exists(slug, exclude_id).await
        }

        async fn sitemap_records(&self, filter: &Where) -> Result<Vec<SitemapRecord>> {
            let records = self.inner.sitemap_records(filter).await?;
            let previous = self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if previous == 0 {
                self.cache
                    .revalidate_tag(SitemapSection::Properties.tag())
                    .await?;
            }
            Ok(records)
        }
    }

    #[tokio::test]
    async fn test_revalidation_during_load_discards_fill() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = create_cache(&CacheConfig::default());
        let properties = Arc::new(WriteDuringLoad {
            inner: SqlxPropertyRepository::boxed(pool.clone()),
            cache: cache.clone(),
            loads: std::sync::atomic::AtomicUsize::new(0),
        });
        let service = SitemapService::new(
            properties.clone(),
            SqlxContentRepository::boxed(pool),
            cache,
            SiteConfig::default(),
        );

        service.entries(SitemapSection::Properties).await.unwrap();
        // The first result was computed before the write, so it must not be served.
        service.entries(SitemapSection::Properties).await.unwrap();
        assert_eq!(properties.loads.load(std::sync::atomic::Ordering::SeqCst), 2);

        service.entries(SitemapSection::Properties).await.unwrap();
        assert_eq!(properties.loads.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_index_lists_all_sections() {
        let (service, _) = setup().await;
        let xml = service.index();
        for section in SitemapSection::ALL {
            assert!(xml.contains(&format!("<loc>https://homes.example{}</loc>", section.route())));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn records() -> impl Strategy<Value = Vec<(Option<String>, Option<i64>)>> {
            proptest::collection::vec(
                (
                    proptest::option::of(prop_oneof!["", " ", "[a-z0-9-]{1,12}"]),
                    proptest::option::of(0i64..2_000_000_000),
                ),
                0..30,
            )
        }

        proptest! {
            #[test]
            fn entries_never_have_empty_slugs(input in records()) {
                let now = Utc::now();
                let records: Vec<SitemapRecord> = input
                    .iter()
                    .map(|(slug, ts)| SitemapRecord {
                        slug: slug.clone(),
                        updated_at: ts.and_then(|t| Utc.timestamp_opt(t, 0).single()),
                    })
                    .collect();
                let entries = build_entries("https://x.test", SitemapSection::Properties, records, now);

                for entry in &entries {
                    prop_assert!(!entry.loc.ends_with("/properties/"));
                    prop_assert!(!entry.loc.ends_with('/'));
                }
                let expected = input
                    .iter()
                    .filter(|(slug, _)| slug.as_deref().is_some_and(|s| !s.trim().is_empty()))
                    .count();
                prop_assert_eq!(entries.len(), expected);
            }

            #[test]
            fn lastmod_is_updated_at_or_now(ts in proptest::option::of(0i64..2_000_000_000)) {
                let now = Utc::now();
                let updated_at = ts.and_then(|t| Utc.timestamp_opt(t, 0).single());
                let entries = build_entries(
                    "https://x.test",
                    SitemapSection::Categories,
                    vec![SitemapRecord { slug: Some("a".into()), updated_at }],
                    now,
                );
                prop_assert_eq!(entries[0].lastmod, updated_at.unwrap_or(now));
            }
        }
    }
}
