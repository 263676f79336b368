//! Harvester core: pure state machine for incremental virtualized-list harvesting.
mod effect;
mod geometry;
mod msg;
mod record;
mod result_set;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use geometry::{GeometrySnapshot, HarvestPolicy, DEFAULT_ROW_HEIGHT_FALLBACK_PX};
pub use msg::Msg;
pub use record::{parse_identity, resolve_link, HarvestedRecord, MissingLine, RowIdentity, RowText};
pub use result_set::ResultSet;
pub use state::{DoneReason, ErrorKind, HarvestState, Phase};
pub use update::update;
pub use view_model::HarvestView;
