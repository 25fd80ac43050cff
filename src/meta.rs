use log::debug;
use serde_json::{json, Value};

use crate::config::{PortalConfig, SectionConfig};
use crate::html;
use crate::models::FeedEntry;

/// Identifies a `<meta>` tag by the attribute it is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaKey {
    /// `<meta name="...">`
    Name(String),
    /// `<meta property="...">`, used by Open Graph.
    Property(String),
}

impl MetaKey {
    pub fn name(key: &str) -> Self {
        MetaKey::Name(key.to_string())
    }

    pub fn property(key: &str) -> Self {
        MetaKey::Property(key.to_string())
    }

    fn attribute(&self) -> (&'static str, &str) {
        match self {
            MetaKey::Name(key) => ("name", key.as_str()),
            MetaKey::Property(key) => ("property", key.as_str()),
        }
    }
}

/// Where document metadata ends up: the live DOM in a browser, a template
/// model when rendering on the server.
pub trait PageMetadataSink {
    fn current_path(&self) -> &str;

    /// Swap the address-bar path without navigating.
    fn replace_path(&mut self, path: &str);

    fn set_title(&mut self, title: &str);

    /// Update the tag's content in place, or create it.
    fn upsert_meta(&mut self, key: MetaKey, content: &str);

    fn set_canonical(&mut self, url: &str);

    fn set_structured_data(&mut self, data: &Value);
}

/// In-memory document head, one tag per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadModel {
    path: String,
    title: String,
    metas: Vec<(MetaKey, String)>,
    canonical: Option<String>,
    structured_data: Option<Value>,
    path_replacements: usize,
}

impl HeadModel {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn meta(&self, key: &MetaKey) -> Option<&str> {
        self.metas
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, content)| content.as_str())
    }

    pub fn meta_count(&self) -> usize {
        self.metas.len()
    }

    pub fn canonical(&self) -> Option<&str> {
        self.canonical.as_deref()
    }

    pub fn structured_data(&self) -> Option<&Value> {
        self.structured_data.as_ref()
    }

    /// How many times the address bar was rewritten.
    pub fn path_replacements(&self) -> usize {
        self.path_replacements
    }

    pub fn to_html(&self) -> String {
        let mut out = format!("<title>{}</title>\n", html::escape(&self.title));
        for (key, content) in &self.metas {
            let (attribute, value) = key.attribute();
            out.push_str(&format!(
                "<meta {}=\"{}\" content=\"{}\">\n",
                attribute,
                html::escape(value),
                html::escape(content)
            ));
        }
        if let Some(canonical) = &self.canonical {
            out.push_str(&format!("<link rel=\"canonical\" href=\"{}\">\n", html::escape(canonical)));
        }
        if let Some(data) = &self.structured_data {
            // `</` would end the script element early
            let json = data.to_string().replace("</", "<\\/");
            out.push_str(&format!("<script type=\"application/ld+json\">{}</script>\n", json));
        }
        out
    }
}

impl PageMetadataSink for HeadModel {
    fn current_path(&self) -> &str {
        &self.path
    }

    fn replace_path(&mut self, path: &str) {
        self.path = path.to_string();
        self.path_replacements += 1;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn upsert_meta(&mut self, key: MetaKey, content: &str) {
        match self.metas.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = content.to_string(),
            None => self.metas.push((key, content.to_string())),
        }
    }

    fn set_canonical(&mut self, url: &str) {
        self.canonical = Some(url.to_string());
    }

    fn set_structured_data(&mut self, data: &Value) {
        self.structured_data = Some(data.clone());
    }
}

/// Rewrites URL and head metadata to describe the active entry.
#[derive(Debug, Clone)]
pub struct MetaSynchronizer {
    site_name: String,
    base_url: String,
    media_base_url: String,
    fallback_image: String,
    description_limit: usize,
    section_slug: String,
    section_label: String,
    rich_meta: bool,
}

impl MetaSynchronizer {
    pub fn new(config: &PortalConfig, section: &SectionConfig) -> Self {
        Self {
            site_name: config.site_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            media_base_url: config.media_base_url.trim_end_matches('/').to_string(),
            fallback_image: config.fallback_image.clone(),
            description_limit: config.description_limit,
            section_slug: section.slug.clone(),
            section_label: section.label.clone(),
            rich_meta: section.rich_meta,
        }
    }

    pub fn entry_path(&self, id: i64) -> String {
        format!("/{}/{}", self.section_slug, id)
    }

    pub fn entry_url(&self, id: i64) -> String {
        format!("{}{}", self.base_url, self.entry_path(id))
    }

    pub fn page_title<E: FeedEntry>(&self, entry: &E) -> String {
        let headline = [entry.title(), entry.name()]
            .into_iter()
            .map(str::trim)
            .find(|s| !s.is_empty());
        match headline {
            Some(headline) => format!("{} | {}", headline, self.site_name),
            None => self.site_name.clone(),
        }
    }

    pub fn description<E: FeedEntry>(&self, entry: &E) -> String {
        html::truncate(&html::strip_tags(entry.description()), self.description_limit)
    }

    /// Video poster, else first image, else the site fallback.
    pub fn image_url<E: FeedEntry>(&self, entry: &E) -> String {
        match entry.media().representative_image() {
            Some(path) => html::resolve_url(&self.media_base_url, path),
            None => html::resolve_url(&self.base_url, &self.fallback_image),
        }
    }

    pub fn sync<E: FeedEntry, S: PageMetadataSink + ?Sized>(&self, entry: &E, sink: &mut S) {
        let path = self.entry_path(entry.id());
        if sink.current_path() != path {
            sink.replace_path(&path);
        }

        let title = self.page_title(entry);
        let description = self.description(entry);
        let url = self.entry_url(entry.id());
        let image = self.image_url(entry);

        sink.set_title(&title);
        sink.upsert_meta(MetaKey::name("description"), &description);

        sink.upsert_meta(MetaKey::property("og:type"), "article");
        sink.upsert_meta(MetaKey::property("og:title"), &title);
        sink.upsert_meta(MetaKey::property("og:description"), &description);
        sink.upsert_meta(MetaKey::property("og:url"), &url);
        sink.upsert_meta(MetaKey::property("og:image"), &image);

        sink.upsert_meta(MetaKey::name("twitter:card"), "summary_large_image");
        sink.upsert_meta(MetaKey::name("twitter:title"), &title);
        sink.upsert_meta(MetaKey::name("twitter:description"), &description);
        sink.upsert_meta(MetaKey::name("twitter:image"), &image);

        if self.rich_meta {
            sink.set_canonical(&url);
            sink.upsert_meta(MetaKey::name("keywords"), &self.keywords(entry));
            sink.set_structured_data(&self.article_data(entry, &description, &url, &image));
        }

        debug!("Synchronized head for {}", path);
    }

    fn keywords<E: FeedEntry>(&self, entry: &E) -> String {
        let mut keywords: Vec<&str> = Vec::new();
        for candidate in [entry.name(), entry.city(), self.section_label.as_str(), self.site_name.as_str()] {
            let candidate = candidate.trim();
            if !candidate.is_empty() && !keywords.iter().any(|k| k.eq_ignore_ascii_case(candidate)) {
                keywords.push(candidate);
            }
        }
        keywords.join(", ")
    }

    fn article_data<E: FeedEntry>(&self, entry: &E, description: &str, url: &str, image: &str) -> Value {
        let mut data = json!({
            "@context": "https://schema.org",
            "@type": "NewsArticle",
            "headline": entry.title().trim(),
            "description": description,
            "image": [image],
            "publisher": {
                "@type": "Organization",
                "name": self.site_name,
            },
            "mainEntityOfPage": {
                "@type": "WebPage",
                "@id": url,
            },
        });
        if !entry.name().trim().is_empty() {
            data["author"] = json!({ "@type": "Person", "name": entry.name().trim() });
        }
        if let Some(published) = entry.published_at() {
            data["datePublished"] = json!(published.to_rfc3339());
        }
        data
    }
}
