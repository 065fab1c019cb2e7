//! Keeps the drawable scene in step with the model and the simulator.
//!
//! Visuals are keyed by node id. A new snapshot only adds and removes
//! visuals for ids that appeared or disappeared; visuals for ids present in
//! both are updated in place. Positions, link endpoints, and pin positions
//! are refreshed once per frame from the simulator, after it ticked.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::assignment::PreviewLine;
use super::interaction::InteractionController;
use super::model::{GraphModel, NodeKind, Point};
use super::pins::pin_offsets;
use super::simulation::LayoutSimulator;
use super::viewport::ViewportTransform;

/// Drawable state of one element pin.
#[derive(Clone, Debug, PartialEq)]
pub struct PinVisual {
	/// Element id.
	pub id: String,
	/// Role name drawn next to the pin.
	pub name: String,
	/// Offset from the node centre.
	pub offset: Point,
	/// Absolute world position.
	pub position: Point,
}

/// Drawable state of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeVisual {
	/// Node id.
	pub id: String,
	/// Creation stamp; unchanged for as long as the id stays in the graph.
	pub generation: u64,
	/// Text drawn under the node.
	pub label: String,
	/// What the node stands for.
	pub kind: NodeKind,
	/// World position after the last tick.
	pub position: Point,
	/// Whether the node is pinned.
	pub pinned: bool,
	/// Whether the node is selected.
	pub selected: bool,
	/// Element pins around the node.
	pub pins: Vec<PinVisual>,
}

/// Drawable state of one link.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkVisual {
	/// Id of the start node.
	pub source_id: String,
	/// Id of the end node.
	pub target_id: String,
	/// Relation name.
	pub kind: String,
	/// Role label drawn at the midpoint.
	pub label: Option<String>,
	/// World position of the start node.
	pub source: Point,
	/// World position of the end node.
	pub target: Point,
	/// Whether the link touches the selected node.
	pub highlighted: bool,
}

/// Ids touched by one reconcile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncDiff {
	/// Ids that got a new visual.
	pub added: Vec<String>,
	/// Ids whose visual was dropped.
	pub removed: Vec<String>,
	/// Visuals kept in place.
	pub retained: usize,
}

/// Drawable scene: one visual per node id plus link endpoints.
#[derive(Clone, Debug)]
pub struct RenderSync {
	/// Rendered node radius in world units at the current zoom.
	node_radius: f64,
	pin_offset: f64,
	nodes: Vec<NodeVisual>,
	index: HashMap<String, usize>,
	links: Vec<LinkVisual>,
	transform: ViewportTransform,
	preview: Option<PreviewLine>,
	next_generation: u64,
}

impl RenderSync {
	/// An empty scene.
	pub fn new(node_radius: f64, pin_offset: f64) -> Self {
		Self {
			node_radius,
			pin_offset,
			nodes: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			transform: ViewportTransform::IDENTITY,
			preview: None,
			next_generation: 0,
		}
	}

	/// Node visuals in model order.
	pub fn nodes(&self) -> &[NodeVisual] {
		&self.nodes
	}

	/// Link visuals in model order.
	pub fn links(&self) -> &[LinkVisual] {
		&self.links
	}

	/// Visual of node `id`.
	pub fn node(&self, id: &str) -> Option<&NodeVisual> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Viewport transform of the last update.
	pub fn transform(&self) -> ViewportTransform {
		self.transform
	}

	/// The assignment preview line, if one is showing.
	pub fn preview(&self) -> Option<PreviewLine> {
		self.preview
	}

	/// Diffs the visual set against `model`.
	pub fn reconcile(&mut self, model: &GraphModel) -> SyncDiff {
		let incoming: HashSet<&str> = model.nodes.iter().map(|n| n.id.as_str()).collect();
		let mut diff = SyncDiff::default();

		let mut kept: HashMap<String, NodeVisual> = HashMap::with_capacity(self.nodes.len());
		for visual in self.nodes.drain(..) {
			if incoming.contains(visual.id.as_str()) {
				kept.insert(visual.id.clone(), visual);
			} else {
				diff.removed.push(visual.id);
			}
		}

		self.index.clear();
		for node in &model.nodes {
			if self.index.contains_key(&node.id) {
				continue;
			}
			let offsets = pin_offsets(node.pins.len(), self.node_radius, self.pin_offset);
			let pins = node
				.pins
				.iter()
				.zip(offsets)
				.map(|(pin, offset)| PinVisual {
					id: pin.id.clone(),
					name: pin.name.clone(),
					offset,
					position: offset,
				})
				.collect();

			let visual = match kept.remove(&node.id) {
				Some(mut visual) => {
					diff.retained += 1;
					visual.label = node.label.clone();
					visual.kind = node.kind;
					visual.pins = pins;
					visual
				}
				None => {
					diff.added.push(node.id.clone());
					let generation = self.next_generation;
					self.next_generation += 1;
					NodeVisual {
						id: node.id.clone(),
						generation,
						label: node.label.clone(),
						kind: node.kind,
						position: node.pinned.or(node.position).unwrap_or_default(),
						pinned: node.pinned.is_some(),
						selected: false,
						pins,
					}
				}
			};
			self.index.insert(node.id.clone(), self.nodes.len());
			self.nodes.push(visual);
		}

		self.links = model
			.links
			.iter()
			.filter(|l| {
				self.index.contains_key(&l.source_id) && self.index.contains_key(&l.target_id)
			})
			.map(|l| LinkVisual {
				source_id: l.source_id.clone(),
				target_id: l.target_id.clone(),
				kind: l.kind.clone(),
				label: l.label.clone(),
				source: Point::ZERO,
				target: Point::ZERO,
				highlighted: false,
			})
			.collect();

		debug!(
			"frame-graph: reconciled visuals (+{} -{} ={})",
			diff.added.len(),
			diff.removed.len(),
			diff.retained
		);
		diff
	}

	/// Copies simulator positions into the visuals and recomputes link
	/// endpoints and pin positions. `node_radius` is the radius nodes are
	/// drawn with at `transform`; pin rings move out or in when it changes.
	pub fn update(
		&mut self,
		sim: &LayoutSimulator,
		transform: ViewportTransform,
		node_radius: f64,
	) {
		self.transform = transform;
		if (node_radius - self.node_radius).abs() > f64::EPSILON {
			self.node_radius = node_radius;
			self.relayout_pins();
		}
		for visual in &mut self.nodes {
			if let Some(position) = sim.position(&visual.id) {
				visual.position = position;
			}
			visual.pinned = sim.pinned(&visual.id).is_some();
			for pin in &mut visual.pins {
				pin.position = visual.position + pin.offset;
			}
		}
		for link in &mut self.links {
			let endpoints = (self.index.get(&link.source_id), self.index.get(&link.target_id));
			if let (Some(&s), Some(&t)) = endpoints {
				link.source = self.nodes[s].position;
				link.target = self.nodes[t].position;
			}
		}
	}

	fn relayout_pins(&mut self) {
		let (radius, offset) = (self.node_radius, self.pin_offset);
		for visual in &mut self.nodes {
			let offsets = pin_offsets(visual.pins.len(), radius, offset);
			for (pin, offset) in visual.pins.iter_mut().zip(offsets) {
				pin.offset = offset;
			}
		}
	}

	/// Marks the selected node and restyles links by the controller's highlight rule.
	pub fn apply_selection(&mut self, interaction: &InteractionController) {
		let selected = interaction.selected();
		for visual in &mut self.nodes {
			visual.selected = selected == Some(visual.id.as_str());
		}
		for link in &mut self.links {
			link.highlighted = interaction.is_highlighted(&link.source_id, &link.target_id);
		}
	}

	/// Shows, moves, or hides the assignment preview line.
	pub fn set_preview(&mut self, preview: Option<PreviewLine>) {
		self.preview = preview;
	}

	/// Nearest node whose centre lies within `radius` of `world`.
	pub fn node_at(&self, world: Point, radius: f64, exclude: Option<&str>) -> Option<&NodeVisual> {
		self.nodes
			.iter()
			.filter(|v| Some(v.id.as_str()) != exclude)
			.map(|v| (v, v.position.distance(world)))
			.filter(|(_, d)| *d <= radius)
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(v, _)| v)
	}

	/// Pin within `radius` of `world`, with its owning node.
	pub fn pin_at(&self, world: Point, radius: f64) -> Option<(&NodeVisual, &PinVisual)> {
		self.nodes
			.iter()
			.flat_map(|v| v.pins.iter().map(move |p| (v, p)))
			.map(|(v, p)| (v, p, p.position.distance(world)))
			.filter(|(_, _, d)| *d <= radius)
			.min_by(|a, b| a.2.total_cmp(&b.2))
			.map(|(v, p, _)| (v, p))
	}

	/// World bounding box of all nodes, including their pin rings.
	pub fn bounds(&self) -> Option<(Point, Point)> {
		let reach = self.node_radius + self.pin_offset;
		let mut iter = self.nodes.iter().map(|v| v.position);
		let first = iter.next()?;
		let (min, max) = iter.fold((first, first), |(min, max), p| {
			(
				Point::new(min.x.min(p.x), min.y.min(p.y)),
				Point::new(max.x.max(p.x), max.y.max(p.y)),
			)
		});
		Some((
			Point::new(min.x - reach, min.y - reach),
			Point::new(max.x + reach, max.y + reach),
		))
	}

	/// Drops every visual, leaving an empty scene.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.index.clear();
		self.links.clear();
		self.preview = None;
	}
}
