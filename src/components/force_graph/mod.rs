//! Force-directed canvas for entities, their frames, and role assignments.
//!
//! Data flows one way: wire records are turned into a node/link model by
//! [`build_graph`], the [`LayoutSimulator`] owns positions, and
//! [`ForceGraphState`] folds input, ticks, and snapshots into a render scene
//! that [`ForceGraphCanvas`] paints once per animation frame.
//!
//! Dragging a node moves it. Dragging with the assignment modifier (Shift by
//! default) onto another node asks for a role name and assigns the dragged
//! entity's frame element to the target.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use frame_graph::{CanvasConfig, ForceGraphCanvas, HttpGraphService};
//!
//! let config = CanvasConfig { environment_id: "env-1".into(), ..Default::default() };
//! let service = Rc::new(HttpGraphService::new(&config.api_base));
//! view! { <ForceGraphCanvas config=config service=service fullscreen=true /> }
//! ```

mod adapter;
mod assignment;
mod component;
mod interaction;
mod model;
mod pins;
mod render;
pub mod scale;
mod scheduler;
mod simulation;
mod state;
mod sync;
pub mod theme;
mod types;
mod viewport;

pub use adapter::{AdapterOptions, AdapterReport, build_graph, entity_node_id, frame_node_id};
pub use assignment::{
	AssignmentIntent, GestureConfig, GestureState, ModifierKey, Modifiers, Notification,
	NotificationKind,
};
pub use component::ForceGraphCanvas;
pub use interaction::InteractionConfig;
pub use model::{GraphModel, Link, Node, NodeKind, NodePayload, Pin, Point};
pub use pins::{pin_angle, pin_offsets};
pub use scale::ScaleConfig;
pub use scheduler::{ManualScheduler, TickScheduler};
pub use simulation::{LayoutSimulator, SimulationConfig};
pub use state::{ForceGraphState, HostAction};
pub use theme::Theme;
pub use types::{
	AssignFrameElement, AssignResponse, ElementRecord, EntityRecord, EnvironmentPayload,
	FrameRecord, FrameRef, RecordId,
};
pub use viewport::{ViewportConfig, ViewportTransform};
