//! frame-graph: interactive force-directed canvas for frame assignments.
//!
//! This crate provides a WASM graph component that lays out the entities of
//! one environment together with their frames, and lets a user assign a
//! frame element to another entity by dragging between nodes.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod api;
pub mod components;
pub mod config;
pub mod error;

pub use api::{GraphService, HttpGraphService, load_environment};
pub use components::force_graph::{
	ForceGraphCanvas, ForceGraphState, GraphModel, HostAction, NodePayload,
};
pub use config::CanvasConfig;
pub use error::GraphError;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("frame-graph: logging initialized");
}

/// Load canvas configuration from a script element with id="canvas-config".
/// Falls back to defaults when the element is missing or malformed.
fn load_canvas_config() -> CanvasConfig {
	let Some(json_text) = config_script_text() else {
		info!("frame-graph: no canvas config on page, using defaults");
		return CanvasConfig::default();
	};
	match CanvasConfig::from_json(&json_text) {
		Ok(config) => {
			info!(
				"frame-graph: loaded config for environment {:?} at {}",
				config.environment_id, config.api_base
			);
			config
		}
		Err(e) => {
			warn!("frame-graph: failed to parse canvas config: {}", e);
			CanvasConfig::default()
		}
	}
}

fn config_script_text() -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("canvas-config")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Main application component.
/// Reads the canvas config from the DOM and renders the frame graph.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_canvas_config();
	let service: Rc<dyn GraphService> = Rc::new(HttpGraphService::new(&config.api_base));
	let environment_id = config.environment_id.clone();
	let selected = RwSignal::new(None::<NodePayload>);

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Frame Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<ForceGraphCanvas
				config=config
				service=service
				environment_id=environment_id
				on_entity_selected=Callback::new(move |payload: Option<NodePayload>| {
					selected.set(payload)
				})
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Frame Graph"</h1>
				<p class="subtitle">
					"Drag nodes to reposition. Shift-drag onto another node to assign a role. "
					"Scroll to zoom."
				</p>
				{move || {
					selected
						.get()
						.map(|payload| {
							view! { <p class="graph-selection">{payload.name().to_string()}</p> }
						})
				}}
			</div>
		</div>
	}
}
