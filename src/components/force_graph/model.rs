//! Node/link model shared by the simulator, the interaction layer, and rendering.

use std::collections::{HashMap, HashSet};
use std::ops::{Add, AddAssign, Mul, Sub};

/// A 2D point or offset in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate.
	pub y: f64,
}

impl Point {
	/// The origin.
	pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

	/// A point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Distance from the origin.
	pub fn length(self) -> f64 {
		(self.x * self.x + self.y * self.y).sqrt()
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		(self - other).length()
	}

	/// Whether both coordinates are finite.
	pub fn is_finite(self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}

	/// Linear interpolation towards `other` (`t = 0` is `self`).
	pub fn lerp(self, other: Point, t: f64) -> Point {
		self + (other - self) * t
	}
}

impl Add for Point {
	type Output = Point;
	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl AddAssign for Point {
	fn add_assign(&mut self, rhs: Point) {
		self.x += rhs.x;
		self.y += rhs.y;
	}
}

impl Sub for Point {
	type Output = Point;
	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl Mul<f64> for Point {
	type Output = Point;
	fn mul(self, rhs: f64) -> Point {
		Point::new(self.x * rhs, self.y * rhs)
	}
}

/// What a node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
	/// An entity of the environment.
	Entity,
	/// A frame shown as its own node.
	Frame,
	/// A frame element shown as its own node.
	Element,
}

/// Source record behind a node, handed to the host on selection.
#[derive(Clone, Debug, PartialEq)]
pub enum NodePayload {
	/// An entity record.
	Entity {
		/// Entity id.
		id: String,
		/// Entity name.
		name: String,
	},
	/// A frame record and the entity it hangs on.
	Frame {
		/// Frame id.
		id: String,
		/// Frame name.
		name: String,
		/// Owning entity id.
		entity_id: String,
	},
	/// A frame element record.
	Element {
		/// Element id.
		id: String,
		/// Role name.
		name: String,
		/// Owning frame id.
		frame_id: String,
	},
}

impl NodePayload {
	/// Entity the payload belongs to, when it is an entity or one of its frames.
	pub fn entity_id(&self) -> Option<&str> {
		match self {
			NodePayload::Entity { id, .. } => Some(id),
			NodePayload::Frame { entity_id, .. } => Some(entity_id),
			NodePayload::Element { .. } => None,
		}
	}

	/// Display name of the record.
	pub fn name(&self) -> &str {
		match self {
			NodePayload::Entity { name, .. }
			| NodePayload::Frame { name, .. }
			| NodePayload::Element { name, .. } => name,
		}
	}
}

/// One frame element drawn as a satellite marker around its owning node.
#[derive(Clone, Debug, PartialEq)]
pub struct Pin {
	/// Element id.
	pub id: String,
	/// Node the pin is drawn around.
	pub owner_node_id: String,
	/// Frame the element belongs to.
	pub frame_id: String,
	/// Role name.
	pub name: String,
	/// Prose definition of the role.
	pub definition: String,
	/// Position in the owner's pin ring (0-based).
	pub angle_index: usize,
}

/// A vertex of the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Unique node id, e.g. `entity-7`.
	pub id: String,
	/// Text drawn under the node.
	pub label: String,
	/// What the node stands for.
	pub kind: NodeKind,
	/// Record handed to the host on selection.
	pub payload: NodePayload,
	/// Last known position. `None` until the simulator places the node.
	pub position: Option<Point>,
	/// Fixed position overriding the simulation.
	pub pinned: Option<Point>,
	/// Frame elements drawn around the node.
	pub pins: Vec<Pin>,
}

/// A directed edge between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
	/// Id of the node the link starts at.
	pub source_id: String,
	/// Id of the node the link points to.
	pub target_id: String,
	/// Relation name, e.g. `reference`.
	pub kind: String,
	/// Role label drawn at the link's midpoint.
	pub label: Option<String>,
}

/// One graph snapshot: unique nodes plus links between them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphModel {
	/// Nodes with unique ids.
	pub nodes: Vec<Node>,
	/// Links whose endpoints are both in `nodes`.
	pub links: Vec<Link>,
}

impl GraphModel {
	/// Looks up a node by id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Drops duplicate node ids (first wins) and links with a missing endpoint.
	///
	/// Returns how many links were dropped.
	pub fn normalize(&mut self) -> usize {
		let mut seen: HashSet<String> = HashSet::with_capacity(self.nodes.len());
		self.nodes.retain(|n| seen.insert(n.id.clone()));
		let before = self.links.len();
		self.links
			.retain(|l| seen.contains(&l.source_id) && seen.contains(&l.target_id));
		before - self.links.len()
	}

	/// Copies positions and pins from `previous` onto nodes with the same id.
	pub fn inherit_positions(&mut self, previous: &GraphModel) {
		let old: HashMap<&str, &Node> = previous.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
		for node in &mut self.nodes {
			if let Some(prev) = old.get(node.id.as_str()) {
				node.position = prev.position.or(node.position);
				node.pinned = prev.pinned.or(node.pinned);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entity(id: &str) -> Node {
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

	#[test]
	fn normalize_drops_duplicates_and_dangling_links() {
		let mut model = GraphModel {
			nodes: vec![entity("a"), entity("b"), entity("a")],
			links: vec![link("a", "b"), link("a", "ghost"), link("ghost", "b")],
		};
		let dropped = model.normalize();
		assert_eq!(model.nodes.len(), 2);
		assert_eq!(model.links, vec![link("a", "b")]);
		assert_eq!(dropped, 2);
	}

	#[test]
	fn inherit_positions_only_touches_matching_ids() {
		let mut previous = GraphModel {
			nodes: vec![entity("a")],
			links: Vec::new(),
		};
		previous.nodes[0].position = Some(Point::new(4.0, 2.0));
		let mut next = GraphModel {
			nodes: vec![entity("a"), entity("b")],
			links: Vec::new(),
		};
		next.inherit_positions(&previous);
		assert_eq!(next.nodes[0].position, Some(Point::new(4.0, 2.0)));
		assert_eq!(next.nodes[1].position, None);
	}

	#[test]
	fn point_math() {
		let a = Point::new(3.0, 4.0);
		assert_eq!(a.length(), 5.0);
		assert_eq!(a.lerp(Point::ZERO, 0.5), Point::new(1.5, 2.0));
		assert!(!Point::new(f64::NAN, 0.0).is_finite());
	}
}
