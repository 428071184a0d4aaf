//! Sitemap and sitemap index rendering (sitemaps.org 0.9)

use std::fmt::Write;

use quick_xml::escape::escape;

use crate::record::Record;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const MOBILE_NS: &str = "http://www.google.com/schemas/sitemap-mobile/1.0";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

pub const URLSET_TRAILER: &str = "</urlset>";
pub const SITEMAPINDEX_TRAILER: &str = "</sitemapindex>";

/// Single-line urlset header; declares the mobile namespace iff `mobile`
pub fn urlset_header(mobile: bool) -> String {
    let mobile_ns = if mobile {
        format!(r#" xmlns:mobile="{MOBILE_NS}""#)
    } else {
        String::new()
    };
    format!(r#"{XML_DECL}<urlset xmlns="{SITEMAP_NS}"{mobile_ns}>"#)
}

/// Render one `<url>` block. Line order is fixed; absent fields leave no tag.
pub fn render_entry(record: &Record, timestamp: &str, mobile: bool) -> String {
    let mut out = String::with_capacity(96 + record.url().len());
    out.push_str("<url>\n");
    let _ = writeln!(out, "<loc>{}</loc>", escape(record.url()));
    let _ = writeln!(out, "<lastmod>{}</lastmod>", escape(timestamp));
    if let Some(freq) = record.change_freq() {
        let _ = writeln!(out, "<changefreq>{}</changefreq>", escape(freq));
    }
    if let Some(priority) = record.priority() {
        let _ = writeln!(out, "<priority>{priority}</priority>");
    }
    if mobile {
        out.push_str("<mobile:mobile/>\n");
    }
    out.push_str("</url>\n");
    out
}

pub fn sitemapindex_header() -> String {
    format!("{XML_DECL}\n<sitemapindex xmlns=\"{SITEMAP_NS}\">\n")
}

/// Render one `<sitemap>` reference of the index document
pub fn render_index_entry(location: &str, lastmod: &str) -> String {
    format!(
        "<sitemap>\n<loc>{}</loc>\n<lastmod>{}</lastmod>\n</sitemap>\n",
        escape(location),
        escape(lastmod)
    )
}
