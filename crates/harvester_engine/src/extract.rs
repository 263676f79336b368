use harvester_core::{
    parse_identity, resolve_link, HarvestedRecord, MissingLine, RowIdentity, RowText,
};

use crate::{HarvestConfig, RenderSurface, Selector, SurfaceError};

#[derive(Debug, thiserror::Error)]
pub enum RowExtractionError {
    #[error("row has no usable `{attribute}` attribute")]
    MissingIdentity { attribute: String },
    #[error("wrapper element at depth {depth} not found")]
    MissingWrapper { depth: usize },
    #[error("link element not found")]
    MissingAnchor,
    #[error("link element has no usable `{attribute}`")]
    MissingLink { attribute: String },
    #[error("row text has {available} lines, line {line} required")]
    MissingLine { line: usize, available: usize },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl From<MissingLine> for RowExtractionError {
    fn from(missing: MissingLine) -> Self {
        RowExtractionError::MissingLine {
            line: missing.line,
            available: missing.available,
        }
    }
}

/// Maps one materialized row to a record by a fixed structural path:
/// `wrapper_depth` nested wrappers, then the link element inside the
/// innermost wrapper, whose text also supplies title and organization lines.
#[derive(Debug, Clone)]
pub struct RowExtractor {
    identity_attribute: String,
    wrapper: Selector,
    wrapper_depth: usize,
    link: Selector,
    link_attribute: String,
    title_line: usize,
    organization_line: usize,
}

impl RowExtractor {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            identity_attribute: config.identity_attribute.clone(),
            wrapper: Selector::css(&config.wrapper_tag),
            wrapper_depth: config.wrapper_depth,
            link: Selector::css(&config.link_tag),
            link_attribute: config.link_attribute.clone(),
            title_line: config.title_line,
            organization_line: config.organization_line,
        }
    }

    pub async fn identity<S: RenderSurface>(
        &self,
        surface: &S,
        row: &S::Handle,
    ) -> Result<RowIdentity, RowExtractionError> {
        surface
            .attribute(row, &self.identity_attribute)
            .await?
            .as_deref()
            .and_then(parse_identity)
            .ok_or_else(|| RowExtractionError::MissingIdentity {
                attribute: self.identity_attribute.clone(),
            })
    }

    pub async fn extract<S: RenderSurface>(
        &self,
        surface: &S,
        row: &S::Handle,
        identity: RowIdentity,
        page_url: &str,
    ) -> Result<HarvestedRecord, RowExtractionError> {
        let mut inner = row.clone();
        for depth in 1..=self.wrapper_depth {
            inner = surface
                .locate_within(&inner, &self.wrapper)
                .await?
                .ok_or(RowExtractionError::MissingWrapper { depth })?;
        }

        let anchor = surface
            .locate_within(&inner, &self.link)
            .await?
            .ok_or(RowExtractionError::MissingAnchor)?;
        let link = surface
            .attribute(&anchor, &self.link_attribute)
            .await?
            .and_then(|href| resolve_link(page_url, &href))
            .ok_or_else(|| RowExtractionError::MissingLink {
                attribute: self.link_attribute.clone(),
            })?;

        let text = surface.text(&inner).await?;
        let RowText {
            title,
            organization,
        } = RowText::from_rendered(&text, self.title_line, self.organization_line)?;

        Ok(HarvestedRecord {
            identity,
            link,
            title,
            organization,
        })
    }
}
