use harvester_core::GeometrySnapshot;

use crate::{RenderSurface, Selector, SurfaceError};

pub const VIEWPORT_HEIGHT_SCRIPT: &str = "return window.innerHeight;";
pub const DOCUMENT_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight;";
pub const SCROLL_OFFSET_SCRIPT: &str = "return window.scrollY;";
pub const READY_STATE_SCRIPT: &str = "return document.readyState;";

pub fn scroll_by_script(px: f64) -> String {
    format!("window.scrollBy(0, {px});")
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("list container has no materialized row")]
    NoRows,
    #[error("`{script}` returned {value}, expected a number")]
    NotANumber { script: &'static str, value: String },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Reads the current layout. Row height is sampled from the first materialized
/// row only, which assumes rows of uniform height.
pub async fn probe<S: RenderSurface>(
    surface: &S,
    container: &S::Handle,
    rows: &Selector,
) -> Result<GeometrySnapshot, ProbeError> {
    let materialized = surface.locate_all(container, rows).await?;
    let first = materialized.first().ok_or(ProbeError::NoRows)?;
    let row_height = surface.height(first).await?;

    Ok(GeometrySnapshot {
        row_height,
        viewport_height: read_number(surface, VIEWPORT_HEIGHT_SCRIPT).await?,
        document_height: read_number(surface, DOCUMENT_HEIGHT_SCRIPT).await?,
        scroll_offset: read_number(surface, SCROLL_OFFSET_SCRIPT).await?,
    })
}

async fn read_number<S: RenderSurface>(
    surface: &S,
    script: &'static str,
) -> Result<f64, ProbeError> {
    let value = surface.evaluate(script).await?;
    value.as_f64().ok_or_else(|| ProbeError::NotANumber {
        script,
        value: value.to_string(),
    })
}
