//! Index builder: the sitemapindex document referencing every segment

use std::path::Path;

use crate::format::{render_index_entry, sitemapindex_header, SITEMAPINDEX_TRAILER};
use crate::naming::{resolve_reference, Resource};
use crate::sink::{Pipeline, ResourceSink};

/// One `<sitemap>` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub location: String,
    pub lastmod: String,
}

/// Ordered segment references, ordinal 1 first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    entries: Vec<IndexEntry>,
}

impl IndexDocument {
    /// Reference segments `1..=segment_count`, using the compressed file
    /// names iff the session compresses.
    pub fn build(segment_count: u64, base_url: &str, compressed: bool, timestamp: &str) -> Self {
        let entries = (1..=segment_count)
            .map(|ordinal| IndexEntry {
                location: resolve_reference(base_url, &Resource::Segment(ordinal).filename(compressed)),
                lastmod: timestamp.to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full document text: header, one block per entry, trailer
    pub fn render(&self) -> String {
        let mut out = sitemapindex_header();
        for entry in &self.entries {
            out.push_str(&render_index_entry(&entry.location, &entry.lastmod));
        }
        out.push_str(SITEMAPINDEX_TRAILER);
        out
    }

    /// Hand the document to a sink; it finalizes like any segment
    pub(crate) fn write(&self, pipeline: &Pipeline, output_dir: &Path) {
        let mut sink = ResourceSink::spawn(pipeline, Resource::Index, Resource::Index.raw_path(output_dir));
        sink.write(self.render());
        sink.close();
        log::debug!("Index written with {} references", self.entries.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_every_segment() {
        let doc = IndexDocument::build(5, "http://www.example.com", false, "T");
        let locations: Vec<_> = doc.entries().iter().map(|e| e.location.as_str()).collect();
        assert_eq!(
            locations,
            vec![
                "http://www.example.com/sitemap-1.xml",
                "http://www.example.com/sitemap-2.xml",
                "http://www.example.com/sitemap-3.xml",
                "http://www.example.com/sitemap-4.xml",
                "http://www.example.com/sitemap-5.xml",
            ]
        );
        assert!(doc.entries().iter().all(|e| e.lastmod == "T"));
    }

    #[test]
    fn compressed_names() {
        let doc = IndexDocument::build(2, "http://www.example.com/", true, "T");
        assert_eq!(doc.entries()[1].location, "http://www.example.com/sitemap-2.xml.gz");
    }

    #[test]
    fn render_document() {
        let doc = IndexDocument::build(1, "http://www.example.com", false, "T");
        assert_eq!(
            doc.render(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n<sitemap>\n<loc>http://www.example.com/sitemap-1.xml</loc>\n<lastmod>T</lastmod>\n</sitemap>\n</sitemapindex>"
        );
    }

    #[test]
    fn zero_segments_is_empty() {
        assert!(IndexDocument::build(0, "", false, "T").is_empty());
    }
}
