//! Click detection and node selection.
//!
//! A press becomes a click when the pointer travels less than
//! [`InteractionConfig::click_distance`] pixels and is released within
//! [`InteractionConfig::click_max_ms`]. Clicking a node toggles its selection;
//! clicking the background clears it. Links touching the selected node are
//! highlighted.

use serde::Deserialize;

use super::model::Point;

/// Thresholds that separate a click from a drag.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
	/// Maximum pointer travel for a click, in screen pixels.
	pub click_distance: f64,
	/// Maximum press duration for a click.
	pub click_max_ms: f64,
}

impl Default for InteractionConfig {
	fn default() -> Self {
		Self {
			click_distance: 4.0,
			click_max_ms: 200.0,
		}
	}
}

/// Outcome of a click that changed (or re-announced) the selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionChange {
	/// A node was selected.
	Selected(String),
	/// The selection was cleared.
	Cleared,
}

#[derive(Clone, Debug)]
struct Press {
	node_id: Option<String>,
	origin: Point,
	at_ms: f64,
	travel: f64,
}

/// Click detection and the current selection.
#[derive(Clone, Debug, Default)]
pub struct InteractionController {
	config: InteractionConfig,
	selected: Option<String>,
	press: Option<Press>,
}

impl InteractionController {
	/// Creates a controller with nothing selected.
	pub fn new(config: InteractionConfig) -> Self {
		Self {
			config,
			selected: None,
			press: None,
		}
	}

	/// Id of the selected node, if any.
	pub fn selected(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	/// Records a press on `node_id` (or the background) at screen point `screen`.
	pub fn pointer_down(&mut self, node_id: Option<&str>, screen: Point, now_ms: f64) {
		self.press = Some(Press {
			node_id: node_id.map(str::to_string),
			origin: screen,
			at_ms: now_ms,
			travel: 0.0,
		});
	}

	/// Tracks pointer travel while pressed.
	pub fn pointer_move(&mut self, screen: Point) {
		if let Some(press) = &mut self.press {
			press.travel = press.travel.max(press.origin.distance(screen));
		}
	}

	/// Ends the press. Returns a change when it qualified as a click.
	pub fn pointer_up(&mut self, screen: Point, now_ms: f64) -> Option<SelectionChange> {
		let press = self.press.take()?;
		let travel = press.travel.max(press.origin.distance(screen));
		if travel > self.config.click_distance || now_ms - press.at_ms > self.config.click_max_ms {
			return None;
		}

		match press.node_id {
			Some(id) if self.selected.as_deref() == Some(id.as_str()) => {
				self.selected = None;
				Some(SelectionChange::Cleared)
			}
			Some(id) => {
				self.selected = Some(id.clone());
				Some(SelectionChange::Selected(id))
			}
			None => {
				self.selected = None;
				Some(SelectionChange::Cleared)
			}
		}
	}

	/// Forgets the current press, e.g. when a touch turns into a pinch.
	pub fn cancel_press(&mut self) {
		self.press = None;
	}

	/// Clears the selection if its node is gone. Returns whether it was cleared.
	pub fn retain_selection(&mut self, exists: impl Fn(&str) -> bool) -> bool {
		match &self.selected {
			Some(id) if !exists(id) => {
				self.selected = None;
				true
			}
			_ => false,
		}
	}

	/// Whether the link between `source_id` and `target_id` touches the selection.
	pub fn is_highlighted(&self, source_id: &str, target_id: &str) -> bool {
		self.selected
			.as_deref()
			.is_some_and(|id| source_id == id || target_id == id)
	}
}
