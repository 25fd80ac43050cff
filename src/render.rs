use crate::controller::Notice;
use crate::html;
use crate::models::FeedEntry;

/// Attribute joining a rendered element back to its entry.
pub const ENTRY_ID_ATTRIBUTE: &str = "data-entry-id";

pub fn render_entry<E: FeedEntry>(entry: &E, media_base_url: &str) -> String {
    let mut out = format!(
        "<article class=\"feed-entry\" {}=\"{}\">\n",
        ENTRY_ID_ATTRIBUTE,
        entry.id()
    );
    out.push_str(&format!("  <h1>{}</h1>\n", html::escape(entry.title().trim())));

    let byline: Vec<String> = [entry.name(), entry.city()]
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(html::escape)
        .collect();
    if !byline.is_empty() {
        out.push_str(&format!("  <p class=\"byline\">{}</p>\n", byline.join(" · ")));
    }

    match entry.published_at() {
        Some(published) => out.push_str(&format!(
            "  <time datetime=\"{}\">{}</time>\n",
            published.to_rfc3339(),
            published.format("%d %b %Y")
        )),
        None => {
            if let Some(raw) = entry.created_at() {
                out.push_str(&format!("  <time>{}</time>\n", html::escape(raw)));
            }
        }
    }

    let media = entry.media();
    if let Some(video) = &media.video {
        let poster = media
            .video_poster
            .as_deref()
            .map(|p| format!(" poster=\"{}\"", html::escape(&html::resolve_url(media_base_url, p))))
            .unwrap_or_default();
        out.push_str(&format!(
            "  <video controls{}><source src=\"{}\"></video>\n",
            poster,
            html::escape(&html::resolve_url(media_base_url, video))
        ));
    }
    for image in &media.images {
        out.push_str(&format!(
            "  <img src=\"{}\" alt=\"{}\" loading=\"lazy\">\n",
            html::escape(&html::resolve_url(media_base_url, image)),
            html::escape(entry.title().trim())
        ));
    }

    // Descriptions are editor-authored HTML and are rendered as such.
    out.push_str(&format!("  <div class=\"entry-body\">{}</div>\n", entry.description()));
    out.push_str("</article>\n");
    out
}

pub fn render_notice(notice: Notice) -> String {
    match notice {
        Notice::EndOfFeed => "<p class=\"feed-end\">You have reached the end</p>\n".to_string(),
        Notice::DuplicateContent => {
            "<div class=\"feed-banner feed-duplicate\">Duplicate content detected, stopped loading to avoid repeats</div>\n"
                .to_string()
        }
        Notice::InitialLoadFailed => {
            "<div class=\"feed-banner feed-error\">Could not load this story <button type=\"button\" data-action=\"retry\">Retry</button></div>\n"
                .to_string()
        }
    }
}

pub fn render_feed<E: FeedEntry>(entries: &[E], notice: Option<Notice>, media_base_url: &str) -> String {
    let mut out = String::from("<section class=\"detail-feed\">\n");
    for entry in entries {
        out.push_str(&render_entry(entry, media_base_url));
    }
    if let Some(notice) = notice {
        out.push_str(&render_notice(notice));
    }
    out.push_str("</section>\n");
    out
}
