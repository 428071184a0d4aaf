//! Read finalized resources back: gunzip when needed, summarize with quick-xml

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::naming::GZIP_SUFFIX;

/// Root element of a sitemap document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    UrlSet,
    SitemapIndex,
}

/// What a sitemap or sitemap index contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub kind: DocumentKind,
    /// `<loc>` values in document order
    pub locations: Vec<String>,
    pub lastmods: Vec<String>,
    /// Entries carrying `<mobile:mobile/>`
    pub mobile_entries: usize,
    /// Root declares `xmlns:mobile`
    pub mobile_namespace: bool,
}

/// Document text of a finalized resource, gunzipped if it ends in `.gz`
pub fn read_resource(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut text = String::new();

    let is_gzip = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(GZIP_SUFFIX));
    if is_gzip {
        GzDecoder::new(reader).read_to_string(&mut text)
    } else {
        reader.read_to_string(&mut text)
    }
    .with_context(|| format!("failed to read {}", path.display()))?;

    Ok(text)
}

/// Parse a urlset or sitemapindex document
pub fn summarize(xml: &str) -> Result<DocumentSummary> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut kind = None;
    let mut mobile_namespace = false;
    let mut locations = Vec::new();
    let mut lastmods = Vec::new();
    let mut mobile_entries = 0usize;

    loop {
        match reader.read_event().context("XML parse error")? {
            Event::Start(e) => match e.name().as_ref() {
                b"urlset" | b"sitemapindex" if kind.is_none() => {
                    kind = Some(if e.name().as_ref() == b"urlset" {
                        DocumentKind::UrlSet
                    } else {
                        DocumentKind::SitemapIndex
                    });
                    mobile_namespace = e
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"xmlns:mobile");
                }
                b"loc" => locations.push(read_text(&mut reader)?),
                b"lastmod" => lastmods.push(read_text(&mut reader)?),
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"mobile:mobile" => mobile_entries += 1,
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(kind) = kind else {
        bail!("no urlset or sitemapindex root element");
    };
    Ok(DocumentSummary {
        kind,
        locations,
        lastmods,
        mobile_entries,
        mobile_namespace,
    })
}

/// Unescaped text up to the end of the current element
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}
