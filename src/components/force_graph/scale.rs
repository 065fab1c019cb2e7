//! Zoom-dependent sizing for canvas visuals.
//!
//! Geometry the layout depends on (node radius, pin ring offset) is fixed in
//! world units. Everything else is drawn after the viewport transform and may
//! scale in one of three ways as the zoom level `k` changes:
//!
//! - [`ScaleBehavior::World`]: constant world size, grows when zooming in.
//! - [`ScaleBehavior::Screen`]: constant pixel size, divided by `k`.
//! - [`ScaleBehavior::Clamped`]: world size bounded to a pixel range.
//!
//! Labels fade by zoom through [`AlphaBehavior`] so dense graphs stay
//! readable when zoomed out.

use serde::Deserialize;

use super::pins::DEFAULT_PIN_OFFSET;

/// How a size reacts to zoom.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ScaleBehavior {
	/// Fixed world size.
	World,
	/// Fixed pixel size.
	Screen,
	/// World size kept within a pixel range.
	#[serde(rename_all = "camelCase")]
	Clamped {
		/// Smallest size in pixels.
		min_screen: f64,
		/// Largest size in pixels.
		max_screen: f64,
	},
}

impl ScaleBehavior {
	/// World-space size for `base` at zoom `k`.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// How opacity reacts to zoom.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum AlphaBehavior {
	/// Always opaque.
	Constant,
	/// Invisible at or below `zero_alpha_k`, opaque at or above `full_alpha_k`.
	#[serde(rename_all = "camelCase")]
	Fade {
		/// Zoom at which the opacity reaches 0.
		zero_alpha_k: f64,
		/// Zoom at which the opacity reaches 1.
		full_alpha_k: f64,
	},
}

impl AlphaBehavior {
	/// Opacity at zoom `k`, between 0 and 1.
	pub fn apply(&self, k: f64) -> f64 {
		match self {
			AlphaBehavior::Constant => 1.0,
			AlphaBehavior::Fade {
				zero_alpha_k,
				full_alpha_k,
			} => {
				if zero_alpha_k == full_alpha_k {
					return 1.0;
				}
				((k - zero_alpha_k) / (full_alpha_k - zero_alpha_k)).clamp(0.0, 1.0)
			}
		}
	}
}

/// Base sizes and zoom behaviors of everything drawn.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleConfig {
	/// Node radius in world units. Also the inner radius of the pin ring.
	pub node_radius: f64,
	/// How the node radius reacts to zoom.
	pub node_behavior: ScaleBehavior,
	/// Gap between the node rim and its pins, in world units.
	pub pin_offset: f64,
	/// Pin radius in world units.
	pub pin_radius: f64,
	/// How the pin radius reacts to zoom.
	pub pin_behavior: ScaleBehavior,
	/// Pin hit radius in screen pixels.
	pub pin_hit_radius: f64,
	/// Label font size in screen pixels.
	pub label_size: f64,
	/// Zoom below which label fonts stop shrinking.
	pub label_min_k: f64,
	/// How node labels fade with zoom.
	pub label_alpha: AlphaBehavior,
	/// Pin names only show when zoomed in.
	pub pin_label_alpha: AlphaBehavior,
	/// Link width in screen pixels.
	pub link_width: f64,
	/// Width of links incident to the selected node, in screen pixels.
	pub highlight_width: f64,
	/// Arrowhead length in world units.
	pub arrow_size: f64,
	/// How arrowheads react to zoom.
	pub arrow_behavior: ScaleBehavior,
	/// Selection ring width in screen pixels.
	pub ring_width: f64,
	/// Dash pattern of the assignment preview line, in screen pixels.
	pub preview_dash: (f64, f64),
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node_radius: 10.0,
			node_behavior: ScaleBehavior::Clamped {
				min_screen: 4.0,
				max_screen: f64::INFINITY,
			},
			pin_offset: DEFAULT_PIN_OFFSET,
			pin_radius: 3.5,
			pin_behavior: ScaleBehavior::Clamped {
				min_screen: 2.0,
				max_screen: 10.0,
			},
			pin_hit_radius: 6.0,
			label_size: 11.0,
			label_min_k: 0.5,
			label_alpha: AlphaBehavior::Fade {
				zero_alpha_k: 0.25,
				full_alpha_k: 0.6,
			},
			pin_label_alpha: AlphaBehavior::Fade {
				zero_alpha_k: 1.1,
				full_alpha_k: 1.6,
			},
			link_width: 1.5,
			highlight_width: 3.0,
			arrow_size: 6.0,
			arrow_behavior: ScaleBehavior::Clamped {
				min_screen: 0.0,
				max_screen: 18.0,
			},
			ring_width: 2.0,
			preview_dash: (6.0, 4.0),
		}
	}
}

/// [`ScaleConfig`] resolved for one zoom level. Build once per frame.
///
/// All sizes are world-space, ready for use after the canvas transform.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	/// Node radius.
	pub node_radius: f64,
	/// Pin radius.
	pub pin_radius: f64,
	/// Pin hit radius.
	pub pin_hit_radius: f64,
	/// CSS font of node labels.
	pub label_font: String,
	/// CSS font of pin labels.
	pub pin_font: String,
	/// Opacity of node labels.
	pub label_alpha: f64,
	/// Opacity of pin labels.
	pub pin_label_alpha: f64,
	/// Link width.
	pub link_width: f64,
	/// Width of highlighted links.
	pub highlight_width: f64,
	/// Arrowhead length.
	pub arrow_size: f64,
	/// Selection ring width.
	pub ring_width: f64,
	/// Dash and gap lengths of the preview line.
	pub preview_dash: (f64, f64),
}

impl ScaledValues {
	/// Resolves `config` at zoom `k`.
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let label_px = config.label_size / k.max(config.label_min_k);
		Self {
			node_radius: config.node_behavior.apply(config.node_radius, k),
			pin_radius: config.pin_behavior.apply(config.pin_radius, k),
			pin_hit_radius: config.pin_hit_radius / k,
			label_font: format!("{label_px}px sans-serif"),
			pin_font: format!("{}px sans-serif", label_px * 0.8),
			label_alpha: config.label_alpha.apply(k),
			pin_label_alpha: config.pin_label_alpha.apply(k),
			link_width: config.link_width / k,
			highlight_width: config.highlight_width / k,
			arrow_size: config.arrow_behavior.apply(config.arrow_size, k),
			ring_width: config.ring_width / k,
			preview_dash: (config.preview_dash.0 / k, config.preview_dash.1 / k),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamped_sizes_keep_a_minimum_on_screen() {
		let b = ScaleBehavior::Clamped {
			min_screen: 4.0,
			max_screen: 20.0,
		};
		assert_eq!(b.apply(10.0, 1.0), 10.0);
		// at k = 0.1 a 10-unit node would be 1px; clamp to 4px = 40 world units
		assert_eq!(b.apply(10.0, 0.1), 40.0);
		assert_eq!(b.apply(10.0, 4.0), 5.0);
		assert_eq!(ScaleBehavior::Screen.apply(3.0, 2.0), 1.5);
	}

	#[test]
	fn labels_fade_out_when_zoomed_out() {
		let v = ScaledValues::new(&ScaleConfig::default(), 0.2);
		assert_eq!(v.label_alpha, 0.0);
		assert_eq!(v.pin_label_alpha, 0.0);
		let v = ScaledValues::new(&ScaleConfig::default(), 2.0);
		assert_eq!(v.label_alpha, 1.0);
		assert_eq!(v.pin_label_alpha, 1.0);
		assert_eq!(v.link_width, 0.75);
	}

	#[test]
	fn partial_overrides_deserialize() {
		let config: ScaleConfig = serde_json::from_str(
			r#"{"nodeRadius": 14, "labelAlpha": {"mode": "constant"}}"#,
		)
		.unwrap();
		assert_eq!(config.node_radius, 14.0);
		assert_eq!(config.label_alpha, AlphaBehavior::Constant);
		assert_eq!(config.pin_offset, DEFAULT_PIN_OFFSET);
	}
}
