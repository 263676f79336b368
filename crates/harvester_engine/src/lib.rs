//! Harvester engine: render surface seam, effect execution and export.
mod config;
mod export;
mod extract;
mod filename;
mod harvest;
mod probe;
mod surface;
mod types;
mod webdriver;

pub use config::{ConfigError, HarvestConfig};
pub use export::{
    ensure_output_dir, render, render_csv, render_json, write_atomic, ExportError, ExportFormat,
    ExportMeta,
};
pub use extract::{RowExtractionError, RowExtractor};
pub use filename::output_filename;
pub use harvest::{Harvester, LogProgressSink, ProgressSink};
pub use probe::{
    probe, scroll_by_script, ProbeError, DOCUMENT_HEIGHT_SCRIPT, READY_STATE_SCRIPT,
    SCROLL_OFFSET_SCRIPT, VIEWPORT_HEIGHT_SCRIPT,
};
pub use surface::{wait_until, RenderSurface, Selector, SurfaceError};
pub use types::{Completion, HarvestEvent, HarvestOutcome};
pub use webdriver::{BrowserKind, DriverSettings, WebDriverSurface};
