//! Canvas configuration, read once from the host page.
//!
//! Every section is optional in the JSON; missing fields take their defaults.

use serde::Deserialize;

use crate::components::force_graph::{
	GestureConfig, InteractionConfig, ScaleConfig, SimulationConfig, ViewportConfig,
};

fn default_api_base() -> String {
	"/api".to_string()
}

/// Every tunable of the canvas, grouped by subsystem.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
	/// Environment whose entities are shown.
	pub environment_id: String,
	/// Prefix of the graph service endpoints.
	pub api_base: String,
	/// Give each frame its own node instead of hanging its pins on the entity.
	pub frame_nodes: bool,
	/// Force layout constants.
	pub simulation: SimulationConfig,
	/// Zoom limits and animation timing.
	pub viewport: ViewportConfig,
	/// Click detection thresholds.
	pub interaction: InteractionConfig,
	/// Assignment drag settings.
	pub gesture: GestureConfig,
	/// Zoom-dependent sizes.
	pub scale: ScaleConfig,
}

impl Default for CanvasConfig {
	fn default() -> Self {
		Self {
			environment_id: String::new(),
			api_base: default_api_base(),
			frame_nodes: false,
			simulation: SimulationConfig::default(),
			viewport: ViewportConfig::default(),
			interaction: InteractionConfig::default(),
			gesture: GestureConfig::default(),
			scale: ScaleConfig::default(),
		}
	}
}

impl CanvasConfig {
	/// Parses a config object; absent fields keep their defaults.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::ModifierKey;

	#[test]
	fn empty_object_is_all_defaults() {
		assert_eq!(CanvasConfig::from_json("{}").unwrap(), CanvasConfig::default());
	}

	#[test]
	fn sections_override_independently() {
		let config = CanvasConfig::from_json(
			r#"{
				"environmentId": "env-3",
				"frameNodes": true,
				"simulation": {"chargeStrength": -120},
				"viewport": {"maxZoom": 8},
				"gesture": {"modifier": "alt", "dropRadius": 30}
			}"#,
		)
		.unwrap();
		assert_eq!(config.environment_id, "env-3");
		assert_eq!(config.api_base, "/api");
		assert!(config.frame_nodes);
		assert_eq!(config.simulation.charge_strength, -120.0);
		assert_eq!(
			config.simulation.link_distance,
			SimulationConfig::default().link_distance
		);
		assert_eq!(config.viewport.max_zoom, 8.0);
		assert_eq!(config.viewport.min_zoom, 0.1);
		assert_eq!(config.gesture.modifier, ModifierKey::Alt);
		assert_eq!(config.gesture.drop_radius, 30.0);
	}

	#[test]
	fn malformed_json_is_an_error() {
		assert!(CanvasConfig::from_json(r#"{"viewport": 3}"#).is_err());
	}
}
