//! RSS 2.0 and sitemap rendering.

use folio_core::config::SiteConfig;
use folio_core::document::{FEED_EXCERPT_LEN, excerpt_or_prefix};
use folio_store::models::{CategoryRow, DocumentDetailRow};
use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

/// Cache policy for feeds: CDN-cacheable for 20 minutes, served stale while
/// revalidating for 10 more.
pub const FEED_CACHE_CONTROL: &str = "public, s-maxage=1200, stale-while-revalidate=600";

/// Wrap text in a CDATA section. `]]>` inside the text is split across two
/// sections.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

/// Escape text for XML character data and attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Public URL of a document page.
pub fn document_url(base_url: &str, slug: &str) -> String {
    format!("{base_url}/docs/{slug}")
}

/// Render the RSS channel for published documents (already newest first).
pub fn render_rss(
    site: &SiteConfig,
    documents: &[DocumentDetailRow],
    now: OffsetDateTime,
) -> Result<String, time::error::Format> {
    let base = site.base_url();
    let mut out = String::new();

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n");
    out.push_str("<channel>\n");
    out.push_str(&format!("<title>{}</title>\n", cdata(&site.title)));
    out.push_str(&format!("<description>{}</description>\n", cdata(&site.description)));
    out.push_str(&format!("<link>{}</link>\n", escape(base)));
    out.push_str(&format!("<language>{}</language>\n", escape(&site.language)));
    out.push_str(&format!("<lastBuildDate>{}</lastBuildDate>\n", now.format(&Rfc2822)?));
    out.push_str(&format!(
        "<atom:link href=\"{}/rss.xml\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape(base)
    ));

    for detail in documents {
        let doc = &detail.document;
        let link = escape(&document_url(base, &doc.slug));
        let description = excerpt_or_prefix(doc.excerpt.as_deref(), &doc.content, FEED_EXCERPT_LEN);

        out.push_str("<item>\n");
        out.push_str(&format!("<title>{}</title>\n", cdata(&doc.title)));
        out.push_str(&format!("<description>{}</description>\n", cdata(&description)));
        out.push_str(&format!("<link>{link}</link>\n"));
        out.push_str(&format!("<guid isPermaLink=\"true\">{link}</guid>\n"));
        out.push_str(&format!("<pubDate>{}</pubDate>\n", doc.created_at.format(&Rfc2822)?));
        out.push_str(&format!(
            "<author>{}</author>\n",
            escape(&format!("{} ({})", detail.author_email, detail.author_name))
        ));
        if let Some(category) = &detail.category_name {
            out.push_str(&format!("<category>{}</category>\n", cdata(category)));
        }
        out.push_str("</item>\n");
    }

    out.push_str("</channel>\n</rss>\n");
    Ok(out)
}

fn push_url(
    out: &mut String,
    loc: &str,
    lastmod: OffsetDateTime,
    changefreq: &str,
    priority: &str,
) -> Result<(), time::error::Format> {
    out.push_str("<url>\n");
    out.push_str(&format!("<loc>{}</loc>\n", escape(loc)));
    out.push_str(&format!("<lastmod>{}</lastmod>\n", lastmod.format(&Rfc3339)?));
    out.push_str(&format!("<changefreq>{changefreq}</changefreq>\n"));
    out.push_str(&format!("<priority>{priority}</priority>\n"));
    out.push_str("</url>\n");
    Ok(())
}

/// Render the sitemap: static pages, published documents, categories.
pub fn render_sitemap(
    site: &SiteConfig,
    documents: &[DocumentDetailRow],
    categories: &[CategoryRow],
    now: OffsetDateTime,
) -> Result<String, time::error::Format> {
    let base = site.base_url();
    let mut out = String::new();

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    push_url(&mut out, base, now, "daily", "1.0")?;
    push_url(&mut out, &format!("{base}/auth/signin"), now, "monthly", "0.3")?;
    push_url(&mut out, &format!("{base}/auth/signup"), now, "monthly", "0.3")?;

    for detail in documents {
        let doc = &detail.document;
        push_url(
            &mut out,
            &document_url(base, &doc.slug),
            doc.updated_at,
            "weekly",
            "0.8",
        )?;
    }

    for category in categories {
        push_url(
            &mut out,
            &format!("{base}/category/{}", category.slug),
            category.created_at,
            "weekly",
            "0.6",
        )?;
    }

    out.push_str("</urlset>\n");
    Ok(out)
}
