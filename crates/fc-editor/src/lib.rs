//! Interactive node-canvas editing: stores, drag handling, port
//! connection protocol, predicted nodes, and undo history.

pub mod canvas;
pub mod commands;
pub mod connect;
pub mod drag;
pub mod edges;
pub mod history;
pub mod input;
pub mod nodes;
pub mod ports;
pub mod predict;
pub mod selection;
pub mod shortcuts;

pub use canvas::{Canvas, MissingInput};
pub use commands::CommandStack;
pub use connect::ConnectOutcome;
pub use history::{HistoryEvent, HistoryLog, HistorySink, NoHistory};
pub use input::{FocusTarget, InputEvent, Modifiers, PointerTarget};
pub use ports::{BoundsProvider, PortKey};
