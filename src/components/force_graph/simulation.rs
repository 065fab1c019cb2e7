//! Force-directed layout simulation.
//!
//! Positions evolve over discrete ticks under four forces:
//! - pairwise repulsion, weakened as the graph grows so dense graphs do not explode
//! - spring attraction along links towards a target length that shrinks with
//!   `log10(node_count)` up to a cap
//! - collision avoidance keeping node centres at least `2 * collision_radius` apart
//! - a weak pull towards the configured centre
//!
//! A scalar `alpha` ("heat") scales the forces and decays geometrically each
//! tick towards `alpha_target`. Once it drops below `alpha_min` the simulation
//! stops asking for frames. Dragging or new data reheats it.
//!
//! Nodes live in an arena indexed by id. Only the simulator writes positions;
//! everything else reads them by id.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = Box::new(ManualScheduler::new());
//! let mut sim = LayoutSimulator::new(SimulationConfig::default(), scheduler);
//! sim.set_graph(&model);
//! while sim.tick() {}
//! let pos = sim.position("entity-1");
//! ```

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use log::debug;
use serde::Deserialize;

use super::model::{GraphModel, Point};
use super::scheduler::TickScheduler;

/// Alpha used when the first nodes arrive.
const INITIAL_ALPHA: f64 = 1.0;
/// Alpha used when a refresh changes an already populated graph.
const REFRESH_ALPHA: f64 = 0.3;
/// Spacing of the phyllotaxis spiral used to place new nodes.
const INITIAL_RADIUS: f64 = 10.0;

/// Tunables for the layout physics.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
	/// Pairwise charge. Negative values repel.
	pub charge_strength: f64,
	/// Link rest length for a tiny graph.
	pub link_distance: f64,
	/// Upper bound of the `1 + log10(n)` divisor applied to `link_distance`.
	pub link_scale_cap: f64,
	/// Per-node radius for collision; centres stay `2 * collision_radius` apart.
	pub collision_radius: f64,
	/// Fraction of an overlap resolved per tick (0..1).
	pub collision_strength: f64,
	/// Horizontal centre of the layout, in world units.
	pub center_x: f64,
	/// Vertical centre of the layout, in world units.
	pub center_y: f64,
	/// Pull towards the centre, per unit of alpha.
	pub center_strength: f64,
	/// Fraction of the gap to `alpha_target` closed each tick.
	pub alpha_decay: f64,
	/// Resting heat. Zero lets the layout converge.
	pub alpha_target: f64,
	/// Heat held while a node is being dragged.
	pub drag_alpha_target: f64,
	/// Below this the simulation is considered converged.
	pub alpha_min: f64,
	/// Fraction of velocity lost per tick (0..1).
	pub velocity_decay: f64,
	/// Distances below this are clamped before computing repulsion.
	pub min_distance: f64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		let alpha_min: f64 = 0.001;
		Self {
			charge_strength: -300.0,
			link_distance: 160.0,
			link_scale_cap: 3.0,
			collision_radius: 28.0,
			collision_strength: 0.7,
			center_x: 0.0,
			center_y: 0.0,
			center_strength: 0.05,
			// Reaches alpha_min from 1.0 in roughly 300 ticks.
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			alpha_target: 0.0,
			drag_alpha_target: 0.3,
			alpha_min,
			velocity_decay: 0.4,
			min_distance: 1.0,
		}
	}
}

impl SimulationConfig {
	/// Repulsion strength for a graph of `node_count` nodes.
	pub fn charge_for(&self, node_count: usize) -> f64 {
		self.charge_strength / (node_count.max(1) as f64).sqrt()
	}

	/// Link rest length for a graph of `node_count` nodes.
	pub fn link_distance_for(&self, node_count: usize) -> f64 {
		let scale = 1.0 + (node_count.max(1) as f64).log10();
		self.link_distance / scale.min(self.link_scale_cap.max(1.0))
	}

	/// The layout centre as a point.
	pub fn center(&self) -> Point {
		Point::new(self.center_x, self.center_y)
	}
}

#[derive(Clone, Debug)]
struct SimNode {
	id: String,
	position: Point,
	velocity: Point,
	pinned: Option<Point>,
}

#[derive(Clone, Copy, Debug)]
struct SimLink {
	source: usize,
	target: usize,
	/// Share of the correction applied to the target (by degree).
	bias: f64,
	strength: f64,
}

/// Membership changes from one [`LayoutSimulator::set_graph`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
	/// Nodes seeded for the first time.
	pub added: usize,
	/// Nodes dropped because the model no longer has them.
	pub removed: usize,
	/// Nodes carried over with their position.
	pub retained: usize,
	/// Whether the set of (source, target) links differs from before.
	pub links_changed: bool,
}

/// Iterative force layout over an arena of nodes.
pub struct LayoutSimulator {
	config: SimulationConfig,
	nodes: Vec<SimNode>,
	index: HashMap<String, usize>,
	links: Vec<SimLink>,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	ticks: u64,
	/// Nodes placed so far, so new arrivals continue the spiral.
	placed: usize,
	scheduler: Box<dyn TickScheduler>,
}

impl LayoutSimulator {
	/// An empty, idle simulator that schedules its ticks on `scheduler`.
	pub fn new(config: SimulationConfig, scheduler: Box<dyn TickScheduler>) -> Self {
		let alpha_target = config.alpha_target;
		Self {
			config,
			nodes: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			alpha: INITIAL_ALPHA,
			alpha_target,
			running: false,
			ticks: 0,
			placed: 0,
			scheduler,
		}
	}

	/// The constants this simulator runs with.
	pub fn config(&self) -> &SimulationConfig {
		&self.config
	}

	/// Moves the point the centering force pulls towards (e.g. after a resize).
	pub fn set_center(&mut self, center: Point) {
		self.config.center_x = center.x;
		self.config.center_y = center.y;
	}

	/// Replaces the node/link set.
	///
	/// Nodes whose id was already present keep position, velocity, and pin.
	/// New nodes take the model's position if it has one, otherwise the next
	/// spot on a spiral around the centre. Links with an unknown endpoint are
	/// ignored. The simulation is reheated when nodes or links changed.
	pub fn set_graph(&mut self, model: &GraphModel) -> SeedReport {
		let was_empty = self.nodes.is_empty();
		let old_links = self.link_keys();
		let mut old: HashMap<String, SimNode> = self
			.nodes
			.drain(..)
			.map(|n| (n.id.clone(), n))
			.collect();
		let mut report = SeedReport::default();

		self.index.clear();
		for node in &model.nodes {
			if self.index.contains_key(&node.id) {
				continue;
			}
			let sim_node = match old.remove(&node.id) {
				Some(mut existing) => {
					report.retained += 1;
					if node.pinned.is_some() {
						existing.pinned = node.pinned;
					}
					existing
				}
				None => {
					report.added += 1;
					let position = node
						.pinned
						.or(node.position)
						.filter(|p| p.is_finite())
						.unwrap_or_else(|| self.next_spiral_point());
					SimNode {
						id: node.id.clone(),
						position,
						velocity: Point::ZERO,
						pinned: node.pinned,
					}
				}
			};
			self.index.insert(node.id.clone(), self.nodes.len());
			self.nodes.push(sim_node);
		}
		report.removed = old.len();

		self.links = model
			.links
			.iter()
			.filter_map(|l| Some((*self.index.get(&l.source_id)?, *self.index.get(&l.target_id)?)))
			.filter(|(s, t)| s != t)
			.map(|(source, target)| SimLink {
				source,
				target,
				bias: 0.0,
				strength: 0.0,
			})
			.collect();
		self.weigh_links();
		report.links_changed = self.link_keys() != old_links;

		if report.added > 0 || report.removed > 0 || report.links_changed {
			self.reheat(if was_empty { INITIAL_ALPHA } else { REFRESH_ALPHA });
		}
		report
	}

	fn link_keys(&self) -> HashSet<(String, String)> {
		self.links
			.iter()
			.map(|l| (self.nodes[l.source].id.clone(), self.nodes[l.target].id.clone()))
			.collect()
	}

	/// Degree-based link weights: busy nodes move less, links into them pull softer.
	fn weigh_links(&mut self) {
		let mut degree = vec![0usize; self.nodes.len()];
		for link in &self.links {
			degree[link.source] += 1;
			degree[link.target] += 1;
		}
		for link in &mut self.links {
			let (ds, dt) = (degree[link.source] as f64, degree[link.target] as f64);
			link.bias = ds / (ds + dt);
			link.strength = 1.0 / ds.min(dt);
		}
	}

	fn next_spiral_point(&mut self) -> Point {
		let i = self.placed as f64;
		self.placed += 1;
		let radius = INITIAL_RADIUS * (0.5 + i).sqrt();
		let angle = i * PI * (3.0 - 5.0_f64.sqrt());
		self.config.center() + Point::new(angle.cos(), angle.sin()) * radius
	}

	/// Raises alpha to at least `alpha` and resumes ticking.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha);
		self.running = true;
		self.scheduler.request_frame();
	}

	/// Keeps the layout warm while the user drags a node.
	pub fn begin_drag(&mut self) {
		self.alpha_target = self.config.drag_alpha_target;
		self.reheat(self.config.drag_alpha_target);
	}

	/// Lets the layout cool down again after a drag.
	pub fn end_drag(&mut self) {
		self.alpha_target = self.config.alpha_target;
	}

	/// Advances one tick. Returns whether the simulation is still running.
	pub fn tick(&mut self) -> bool {
		if !self.running {
			return false;
		}
		if self.nodes.is_empty() {
			self.running = false;
			return false;
		}

		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		self.apply_charge();
		self.apply_links();
		self.apply_collisions();
		self.apply_centering();
		self.integrate();
		self.ticks += 1;

		if self.alpha < self.config.alpha_min {
			self.running = false;
			debug!(
				"frame-graph: layout converged after {} ticks ({} nodes)",
				self.ticks,
				self.nodes.len()
			);
			return false;
		}
		self.scheduler.request_frame();
		true
	}

	fn apply_charge(&mut self) {
		let n = self.nodes.len();
		let strength = self.config.charge_for(n) * self.alpha;
		let min_sq = self.config.min_distance * self.config.min_distance;
		for i in 0..n {
			for j in (i + 1)..n {
				let mut delta = self.nodes[j].position - self.nodes[i].position;
				if delta.length() == 0.0 {
					delta = jiggle(i, j);
				}
				let dist_sq = (delta.x * delta.x + delta.y * delta.y).max(min_sq);
				let push = delta * (strength / dist_sq);
				self.nodes[i].velocity += push;
				self.nodes[j].velocity += push * -1.0;
			}
		}
	}

	fn apply_links(&mut self) {
		let distance = self.config.link_distance_for(self.nodes.len());
		for k in 0..self.links.len() {
			let SimLink {
				source,
				target,
				bias,
				strength,
			} = self.links[k];
			let (s, t) = (&self.nodes[source], &self.nodes[target]);
			let mut delta = (t.position + t.velocity) - (s.position + s.velocity);
			let mut len = delta.length();
			if len == 0.0 {
				delta = jiggle(source, target);
				len = delta.length();
			}
			let correction = delta * ((len - distance) / len * self.alpha * strength);
			self.nodes[target].velocity += correction * -bias;
			self.nodes[source].velocity += correction * (1.0 - bias);
		}
	}

	fn apply_collisions(&mut self) {
		let n = self.nodes.len();
		let separation = 2.0 * self.config.collision_radius;
		if separation <= 0.0 {
			return;
		}
		for i in 0..n {
			for j in (i + 1)..n {
				let (a, b) = (&self.nodes[i], &self.nodes[j]);
				let mut delta = (b.position + b.velocity) - (a.position + a.velocity);
				let mut len = delta.length();
				if len >= separation {
					continue;
				}
				if len == 0.0 {
					delta = jiggle(i, j);
					len = delta.length();
				}
				let push = (separation - len) / len * self.config.collision_strength * 0.5;
				let shift = delta * push;
				self.nodes[i].velocity += shift * -1.0;
				self.nodes[j].velocity += shift;
			}
		}
	}

	fn apply_centering(&mut self) {
		let center = self.config.center();
		let k = self.config.center_strength * self.alpha;
		for node in &mut self.nodes {
			node.velocity += (center - node.position) * k;
		}
	}

	fn integrate(&mut self) {
		let keep = 1.0 - self.config.velocity_decay;
		let center = self.config.center();
		for node in &mut self.nodes {
			if let Some(fixed) = node.pinned {
				node.position = fixed;
				node.velocity = Point::ZERO;
				continue;
			}
			let previous = node.position;
			node.position += node.velocity;
			node.velocity = node.velocity * keep;
			if !node.position.is_finite() || !node.velocity.is_finite() {
				node.position = if previous.is_finite() { previous } else { center };
				node.velocity = Point::ZERO;
			}
		}
	}

	/// Fixes `id` at `at` until [`unpin`](Self::unpin). Returns false for unknown ids.
	pub fn pin(&mut self, id: &str, at: Point) -> bool {
		let Some(node) = self.node_mut(id) else {
			return false;
		};
		node.pinned = Some(at);
		node.position = at;
		node.velocity = Point::ZERO;
		true
	}

	/// Releases a pin, returning where it was.
	pub fn unpin(&mut self, id: &str) -> Option<Point> {
		self.node_mut(id)?.pinned.take()
	}

	/// Restores a pin state captured earlier with [`pinned`](Self::pinned).
	pub fn restore_pin(&mut self, id: &str, pin: Option<Point>) {
		match pin {
			Some(at) => {
				self.pin(id, at);
			}
			None => {
				self.unpin(id);
			}
		}
	}

	/// Moves a node without pinning it (used to send a dragged node home).
	pub fn place(&mut self, id: &str, at: Point) {
		if let Some(node) = self.node_mut(id) {
			node.position = at;
			node.velocity = Point::ZERO;
		}
	}

	/// Fixed position of `id`, if it is pinned.
	pub fn pinned(&self, id: &str) -> Option<Point> {
		self.node(id)?.pinned
	}

	/// Current position of `id`.
	pub fn position(&self, id: &str) -> Option<Point> {
		self.node(id).map(|n| n.position)
	}

	/// Iterates `(id, position)` in arena order.
	pub fn positions(&self) -> impl Iterator<Item = (&str, Point)> {
		self.nodes.iter().map(|n| (n.id.as_str(), n.position))
	}

	/// Writes current positions and pins onto the matching nodes of `model`.
	pub fn export_positions(&self, model: &mut GraphModel) {
		for node in &mut model.nodes {
			if let Some(sim) = self.node(&node.id) {
				node.position = Some(sim.position);
				node.pinned = sim.pinned;
			}
		}
	}

	/// Number of links in the layout.
	pub fn link_count(&self) -> usize {
		self.links.len()
	}

	/// Current temperature. Ticks stop once it falls below `alpha_min`.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Whether a tick is scheduled or due.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Ticks run since construction.
	pub fn ticks(&self) -> u64 {
		self.ticks
	}

	/// Asks the scheduler for a frame without reheating (e.g. for a redraw).
	pub fn request_frame(&mut self) {
		self.scheduler.request_frame();
	}

	/// Stops ticking and drops any pending frame. Used on teardown.
	pub fn stop(&mut self) {
		self.running = false;
		self.scheduler.cancel();
	}

	fn node(&self, id: &str) -> Option<&SimNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	fn node_mut(&mut self, id: &str) -> Option<&mut SimNode> {
		self.index.get(id).copied().map(|i| &mut self.nodes[i])
	}
}

/// Tiny deterministic offset separating coincident nodes.
fn jiggle(i: usize, j: usize) -> Point {
	let angle = (i * 7919 + j * 104_729) as f64;
	Point::new(angle.cos(), angle.sin()) * 1e-3
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::model::{Link, Node, NodeKind, NodePayload};
	use crate::components::force_graph::scheduler::ManualScheduler;

	fn node(id: &str) -> Node {
		Node {
			id: id.into(),
			label: id.into(),
			kind: NodeKind::Entity,
			payload: NodePayload::Entity {
				id: id.into(),
				name: id.into(),
			},
			position: None,
			pinned: None,
			pins: Vec::new(),
		}
	}

	fn link(a: &str, b: &str) -> Link {
		Link {
			source_id: a.into(),
			target_id: b.into(),
			kind: "element".into(),
			label: None,
		}
	}

	fn model(ids: &[&str], links: &[(&str, &str)]) -> GraphModel {
		GraphModel {
			nodes: ids.iter().map(|id| node(id)).collect(),
			links: links.iter().map(|(a, b)| link(a, b)).collect(),
		}
	}

	fn simulator() -> (LayoutSimulator, ManualScheduler) {
		let scheduler = ManualScheduler::new();
		let sim = LayoutSimulator::new(SimulationConfig::default(), Box::new(scheduler.clone()));
		(sim, scheduler)
	}

	#[test]
	fn converges_within_bounded_ticks() {
		let (mut sim, _) = simulator();
		sim.set_graph(&model(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]));
		let mut ticks = 0;
		while sim.tick() {
			ticks += 1;
			assert!(ticks < 1_000, "simulation did not converge");
		}
		assert!(sim.alpha() < sim.config().alpha_min);
		assert!(!sim.is_running());
		assert!(ticks <= 310, "took {ticks} ticks");
	}

	#[test]
	fn ticking_requests_frames_until_converged() {
		let (mut sim, scheduler) = simulator();
		sim.set_graph(&model(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		assert!(scheduler.take());
		assert!(sim.tick());
		assert!(scheduler.take());
		while sim.tick() {}
		scheduler.take();
		assert!(!sim.tick());
		assert!(!scheduler.is_pending());
	}

	#[test]
	fn coincident_nodes_separate_without_nan() {
		let (mut sim, _) = simulator();
		let mut m = model(&["a", "b", "c"], &[("a", "b")]);
		for n in &mut m.nodes {
			n.position = Some(Point::new(5.0, 5.0));
		}
		sim.set_graph(&m);
		for _ in 0..50 {
			sim.tick();
		}
		let positions: Vec<Point> = sim.positions().map(|(_, p)| p).collect();
		assert!(positions.iter().all(|p| p.is_finite()));
		assert!(positions[0].distance(positions[1]) > 1.0);
	}

	#[test]
	fn links_pull_towards_rest_length() {
		let config = SimulationConfig {
			charge_strength: 0.0,
			collision_radius: 0.0,
			center_strength: 0.0,
			..SimulationConfig::default()
		};
		let rest = config.link_distance_for(3);
		let mut sim = LayoutSimulator::new(config, Box::new(ManualScheduler::new()));
		let mut m = model(&["a", "b", "c"], &[("a", "b")]);
		m.nodes[0].position = Some(Point::new(-500.0, 0.0));
		m.nodes[1].position = Some(Point::new(500.0, 0.0));
		m.nodes[2].position = Some(Point::new(0.0, 300.0));
		sim.set_graph(&m);
		while sim.tick() {}
		let d = sim.position("a").unwrap().distance(sim.position("b").unwrap());
		assert!((d - rest).abs() < 15.0, "settled at {d}, rest length {rest}");
		assert_eq!(sim.position("c"), Some(Point::new(0.0, 300.0)));
	}

	#[test]
	fn collision_keeps_minimum_separation() {
		let (mut sim, _) = simulator();
		sim.set_graph(&model(&["a", "b"], &[("a", "b")]));
		while sim.tick() {}
		let d = sim.position("a").unwrap().distance(sim.position("b").unwrap());
		assert!(d > sim.config().collision_radius, "nodes overlap at {d}");
	}

	#[test]
	fn pinned_nodes_do_not_move() {
		let (mut sim, _) = simulator();
		sim.set_graph(&model(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		let anchor = Point::new(40.0, -10.0);
		assert!(sim.pin("b", anchor));
		for _ in 0..100 {
			sim.tick();
		}
		assert_eq!(sim.position("b"), Some(anchor));
		assert_eq!(sim.unpin("b"), Some(anchor));
		assert_eq!(sim.pinned("b"), None);
		assert!(!sim.pin("ghost", anchor));
	}

	#[test]
	fn refresh_preserves_positions_of_retained_nodes() {
		let (mut sim, _) = simulator();
		sim.set_graph(&model(&["a", "b", "c"], &[("a", "b")]));
		for _ in 0..30 {
			sim.tick();
		}
		let a = sim.position("a").unwrap();
		let b = sim.position("b").unwrap();

		let report = sim.set_graph(&model(&["a", "b", "d"], &[("a", "d")]));
		assert_eq!(
			report,
			SeedReport {
				added: 1,
				removed: 1,
				retained: 2,
				links_changed: true,
			}
		);
		assert_eq!(sim.position("a"), Some(a));
		assert_eq!(sim.position("b"), Some(b));
		assert!(sim.position("c").is_none());
		assert!(sim.is_running());
		assert_eq!(sim.link_count(), 1);
	}

	#[test]
	fn unchanged_membership_does_not_reheat() {
		let (mut sim, _) = simulator();
		let m = model(&["a", "b"], &[("a", "b")]);
		sim.set_graph(&m);
		while sim.tick() {}
		sim.set_graph(&m);
		assert!(!sim.is_running());
	}

	#[test]
	fn new_link_between_known_nodes_reheats() {
		let (mut sim, scheduler) = simulator();
		sim.set_graph(&model(&["a", "b", "c"], &[("a", "b")]));
		while sim.tick() {}
		scheduler.take();

		let report = sim.set_graph(&model(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		assert_eq!((report.added, report.removed), (0, 0));
		assert!(report.links_changed);
		assert!(sim.is_running());
		assert!(scheduler.take());
	}

	#[test]
	fn dangling_and_self_links_are_ignored() {
		let (mut sim, _) = simulator();
		sim.set_graph(&model(&["a", "b"], &[("a", "ghost"), ("a", "a"), ("a", "b")]));
		assert_eq!(sim.link_count(), 1);
	}

	#[test]
	fn drag_holds_heat_until_released() {
		let (mut sim, _) = simulator();
		sim.set_graph(&model(&["a", "b", "c"], &[("a", "b")]));
		while sim.tick() {}
		sim.begin_drag();
		for _ in 0..500 {
			assert!(sim.tick());
		}
		sim.end_drag();
		let mut ticks = 0;
		while sim.tick() {
			ticks += 1;
			assert!(ticks < 1_000);
		}
	}

	#[test]
	fn charge_and_link_length_scale_with_size() {
		let config = SimulationConfig::default();
		assert!(config.charge_for(100).abs() < config.charge_for(4).abs());
		assert!(config.link_distance_for(100) < config.link_distance_for(10));
		assert_eq!(
			config.link_distance_for(100_000),
			config.link_distance / config.link_scale_cap
		);
		assert_eq!(config.link_distance_for(1), config.link_distance);
	}

	#[test]
	fn stop_cancels_the_scheduler() {
		let (mut sim, scheduler) = simulator();
		sim.set_graph(&model(&["a", "b"], &[]));
		sim.stop();
		assert!(!scheduler.is_pending());
		assert_eq!(scheduler.cancellations(), 1);
		assert!(!sim.tick());
	}
}
