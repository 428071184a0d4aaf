//! Output naming: which file each resource lands in, and how the index refers to it

use std::path::{Path, PathBuf};

/// Suffix appended to a raw resource once gzipped
pub const GZIP_SUFFIX: &str = ".gz";

/// A resource produced by a session: one segment or the index document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Segment(u64),
    Index,
}

impl Resource {
    /// File name, with the gzip suffix iff `compressed`
    pub fn filename(self, compressed: bool) -> String {
        let base = match self {
            Self::Segment(ordinal) => format!("sitemap-{ordinal}.xml"),
            Self::Index => "sitemapindex.xml".to_string(),
        };
        if compressed {
            base + GZIP_SUFFIX
        } else {
            base
        }
    }

    /// Location of the uncompressed resource under `output_dir`
    pub fn raw_path(self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.filename(false))
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segment(ordinal) => write!(f, "segment {ordinal}"),
            Self::Index => write!(f, "index"),
        }
    }
}

/// Sibling location holding the gzipped derivative of `raw`
pub fn compressed_path(raw: &Path) -> PathBuf {
    let mut name = raw.as_os_str().to_owned();
    name.push(GZIP_SUFFIX);
    PathBuf::from(name)
}

/// Combine the index base URL with a segment file name.
///
/// An empty base leaves the bare file name; otherwise exactly one `/`
/// separates the two.
pub fn resolve_reference(base: &str, filename: &str) -> String {
    if base.is_empty() {
        return filename.to_string();
    }
    format!("{}/{filename}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames() {
        assert_eq!(Resource::Segment(1).filename(false), "sitemap-1.xml");
        assert_eq!(Resource::Segment(12).filename(true), "sitemap-12.xml.gz");
        assert_eq!(Resource::Index.filename(false), "sitemapindex.xml");
        assert_eq!(Resource::Index.filename(true), "sitemapindex.xml.gz");
    }

    #[test]
    fn raw_path_under_output_dir() {
        assert_eq!(
            Resource::Segment(3).raw_path(Path::new("./")),
            PathBuf::from("./sitemap-3.xml")
        );
    }

    #[test]
    fn compressed_sibling() {
        assert_eq!(
            compressed_path(Path::new("out/sitemap-1.xml")),
            PathBuf::from("out/sitemap-1.xml.gz")
        );
    }

    #[test]
    fn reference_resolution() {
        assert_eq!(resolve_reference("", "sitemap-1.xml"), "sitemap-1.xml");
        assert_eq!(
            resolve_reference("http://www.example.com", "sitemap-1.xml"),
            "http://www.example.com/sitemap-1.xml"
        );
        assert_eq!(
            resolve_reference("http://www.example.com/maps/", "sitemap-2.xml.gz"),
            "http://www.example.com/maps/sitemap-2.xml.gz"
        );
    }
}
