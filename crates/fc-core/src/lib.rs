pub mod catalog;
pub mod config;
pub mod flow;
pub mod geometry;
pub mod id;
pub mod model;
pub mod state;
pub mod types;

pub use catalog::Catalog;
pub use config::CanvasConfig;
pub use geometry::{Point, Rect, Size, View};
pub use id::{EdgeId, NodeId, PortId, SpecId};
pub use model::*;
pub use state::{CanvasState, LoadReport, PartialCanvasState};
pub use types::{DefaultTypeCompat, TypeCompat, TypeExpr};
