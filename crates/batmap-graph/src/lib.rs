//! Batmap Graph - room/exit graph for the area mapper.
//!
//! This crate holds the in-memory side of the mapper:
//!
//! - **Schema**: `Area`, `Room`, `Exit` and the `Compass` directions
//! - **Graph**: `AreaGraph`, a directed multigraph of rooms and exits per area
//! - **Engine**: `MapperEngine`, which consumes room arrivals and answers
//!   path and label queries
//! - **Command**: the tagged commands event sources feed into the engine
//!
//! # Example
//!
//! ```
//! use batmap_graph::{Area, MapperEngine, TELEPORT_EXIT};
//!
//! let mut engine = MapperEngine::new(Area::new("sunderland"));
//! engine.move_to_room("r1", TELEPORT_EXIT, "A long road.", "Road", false, ["north"]);
//! engine.move_to_room("r2", "north", "A gate.", "Gate", false, ["south"]);
//! engine.move_to_room("r1", "south", "A long road.", "Road", false, ["north"]);
//!
//! assert_eq!(engine.check_dirs_from_current_room_to("r2", false).as_deref(), Some("north;"));
//! ```

pub mod command;
pub mod engine;
pub mod error;
pub mod graph;
pub mod schema;

// Re-export commonly used types
pub use command::{CommandOutcome, MapperCommand, MapperMode};
pub use engine::{MapperEngine, TELEPORT_EXIT};
pub use error::GraphError;
pub use graph::{AreaGraph, Edge};
pub use schema::{Area, AreaSnapshot, Color, Compass, Exit, Location, Room};
