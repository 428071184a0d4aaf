//! Verify subcommand - check an index against the segments next to it

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;

use sitemill_core::progress::fmt_num;
use sitemill_core::{DocumentKind, read_resource, summarize};

use super::print_summary;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Sitemap index (sitemapindex.xml or sitemapindex.xml.gz)
    pub index: PathBuf,
}

#[derive(Debug, Default)]
struct Verification {
    referenced: usize,
    entries: usize,
    mobile_entries: usize,
    missing: Vec<String>,
}

pub fn run(args: VerifyArgs) -> Result<()> {
    let result = check(&args.index)?;

    print_summary(
        "Verify",
        &[
            ("Index", args.index.display().to_string()),
            (
                "Segments",
                format!(
                    "{} referenced ({} missing)",
                    result.referenced,
                    result.missing.len()
                ),
            ),
            ("Entries", fmt_num(result.entries as u64)),
            ("Mobile", fmt_num(result.mobile_entries as u64)),
        ],
    );

    if !result.missing.is_empty() {
        bail!("Missing segments: {}", result.missing.join(", "));
    }
    Ok(())
}

/// Resolve every index reference by file name against the index directory
fn check(index: &Path) -> Result<Verification> {
    let summary = summarize(&read_resource(index)?)
        .with_context(|| format!("Failed to parse {}", index.display()))?;
    if summary.kind != DocumentKind::SitemapIndex {
        bail!("{} is not a sitemap index", index.display());
    }

    let dir = index.parent().unwrap_or(Path::new("."));
    let mut result = Verification {
        referenced: summary.locations.len(),
        ..Default::default()
    };

    for location in &summary.locations {
        let name = location.rsplit('/').next().unwrap_or(location);
        let path = dir.join(name);
        if !path.exists() {
            log::warn!("Referenced segment not found: {}", path.display());
            result.missing.push(name.to_string());
            continue;
        }

        let segment = summarize(&read_resource(&path)?)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if segment.kind != DocumentKind::UrlSet {
            bail!("{} is not a urlset", path.display());
        }
        log::debug!("{name}: {} entries", segment.locations.len());
        result.entries += segment.locations.len();
        result.mobile_entries += segment.mobile_entries;
    }
    Ok(result)
}
