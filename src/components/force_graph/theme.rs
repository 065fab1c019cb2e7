//! Colours and stroke styles for the frame graph.

use super::model::NodeKind;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity, 0 to 1.
	pub a: f64,
}

impl Color {
	/// An opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// A color with opacity `a`.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// The same color with opacity `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	/// CSS form: `#rrggbb` when opaque, `rgba(..)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Canvas background.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Flat color, and the outer color of the gradient.
	pub color: Color,
	/// Centre colour of the radial gradient.
	pub color_secondary: Color,
	/// Paint a radial gradient instead of a flat fill.
	pub use_gradient: bool,
}

/// Fill per node kind.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Entity fill.
	pub entity: Color,
	/// Frame fill.
	pub frame: Color,
	/// Element fill.
	pub element: Color,
	/// Shade nodes with a radial gradient.
	pub use_gradient: bool,
	/// Label text.
	pub label: Color,
	/// Ring drawn around the selected node.
	pub selection_ring: Color,
	/// Outline of pinned nodes.
	pub pinned_border: Color,
}

impl NodeStyle {
	/// Fill for a node of `kind`.
	pub fn fill(&self, kind: NodeKind) -> Color {
		match kind {
			NodeKind::Entity => self.entity,
			NodeKind::Frame => self.frame,
			NodeKind::Element => self.element,
		}
	}
}

/// Element pin colors.
#[derive(Clone, Debug)]
pub struct PinStyle {
	/// Pin fill.
	pub fill: Color,
	/// Pin outline.
	pub stroke: Color,
	/// Pin name text.
	pub label: Color,
}

/// Link colors.
#[derive(Clone, Debug)]
pub struct LinkStyle {
	/// Default stroke.
	pub color: Color,
	/// Stroke for links incident to the selected node.
	pub highlight: Color,
	/// Links joining an entity to its own frame node.
	pub frame_color: Color,
	/// Role label text.
	pub label: Color,
	/// Dashed line shown while dragging an assignment.
	pub preview: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Background colors.
	pub background: BackgroundStyle,
	/// Node colors.
	pub node: NodeStyle,
	/// Pin colors.
	pub pin: PinStyle,
	/// Link colors.
	pub link: LinkStyle,
}

impl Theme {
	/// Dark slate theme (default).
	pub fn slate() -> Self {
		Self {
			background: BackgroundStyle {
				color: Color::rgb(22, 27, 34),
				color_secondary: Color::rgb(30, 35, 42),
				use_gradient: true,
			},
			node: NodeStyle {
				entity: Color::rgb(94, 129, 172),
				frame: Color::rgb(180, 136, 100),
				element: Color::rgb(119, 158, 165),
				use_gradient: true,
				label: Color::rgba(255, 255, 255, 0.85),
				selection_ring: Color::rgb(236, 201, 75),
				pinned_border: Color::rgba(255, 255, 255, 0.6),
			},
			pin: PinStyle {
				fill: Color::rgb(143, 188, 187),
				stroke: Color::rgb(22, 27, 34),
				label: Color::rgba(220, 228, 236, 0.8),
			},
			link: LinkStyle {
				color: Color::rgba(140, 160, 180, 0.5),
				highlight: Color::rgb(236, 201, 75),
				frame_color: Color::rgba(180, 136, 100, 0.35),
				label: Color::rgba(200, 210, 220, 0.7),
				preview: Color::rgb(235, 120, 100),
			},
		}
	}

	/// Flat, gradient-free variant for low-end devices.
	pub fn minimal() -> Self {
		let mut theme = Self::slate();
		theme.background.use_gradient = false;
		theme.node.use_gradient = false;
		theme
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::slate()
	}
}
