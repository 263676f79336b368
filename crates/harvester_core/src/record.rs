use serde::{Deserialize, Serialize};
use url::Url;

/// Page-assigned ordinal of a list row (`data-index` on the observed site).
pub type RowIdentity = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestedRecord {
    pub identity: RowIdentity,
    pub link: String,
    pub title: String,
    pub organization: String,
}

pub fn parse_identity(raw: &str) -> Option<RowIdentity> {
    raw.trim().parse().ok()
}

/// Title and organization taken from fixed line offsets of a row's rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowText {
    pub title: String,
    pub organization: String,
}

/// The rendered text had fewer lines than a configured offset requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingLine {
    pub line: usize,
    pub available: usize,
}

impl RowText {
    pub fn from_rendered(
        text: &str,
        title_line: usize,
        organization_line: usize,
    ) -> Result<Self, MissingLine> {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let pick = |line: usize| {
            lines.get(line).map(|s| s.to_string()).ok_or(MissingLine {
                line,
                available: lines.len(),
            })
        };

        Ok(Self {
            title: pick(title_line)?,
            organization: pick(organization_line)?,
        })
    }
}

/// Resolves an anchor's `href` against the page URL.
///
/// Absolute links are returned normalized; relative links are joined onto
/// `page_url`. Empty or unresolvable values yield `None`.
pub fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}
