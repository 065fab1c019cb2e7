//! Converts an environment payload into the node/link model.
//!
//! Each entity becomes one node. Every frame element whose value names
//! another known entity becomes a link from the element's owner to that
//! entity, labelled with the element name. Elements also become pins on
//! their owner so they can be drawn and dragged.
//!
//! The conversion never fails: entities without an id are left out and
//! references to unknown entities are skipped. Both are counted in
//! [`AdapterReport`] and logged.

use std::collections::HashSet;

use log::{debug, warn};

use super::model::{GraphModel, Link, Node, NodeKind, NodePayload, Pin};
use super::types::{EntityRecord, EnvironmentPayload, FrameRecord, FrameRef};

/// Link kind for element role references.
pub const ELEMENT_LINK: &str = "element";
/// Link kind joining an entity to its frame node.
pub const FRAME_LINK: &str = "frame";

/// Node id for an entity record.
pub fn entity_node_id(entity_id: &str) -> String {
	format!("entity-{entity_id}")
}

/// Node id for a frame record.
pub fn frame_node_id(frame_id: &str) -> String {
	format!("frame-{frame_id}")
}

/// Shape options for the derived graph.
#[derive(Clone, Debug, Default)]
pub struct AdapterOptions {
	/// Give every embedded frame its own node, linked from its entity.
	/// Element pins and role links then hang off the frame node.
	pub frame_nodes: bool,
}

/// Counts of records that did not make it into the model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterReport {
	/// Entities without a usable id.
	pub skipped_entities: usize,
	/// Entities whose id was already taken by an earlier record.
	pub duplicate_entities: usize,
	/// Element values naming an entity that is not in the payload.
	pub unresolved_references: usize,
	/// Element values naming their own entity.
	pub self_references: usize,
	/// Frames listed only by id, whose elements are unknown.
	pub unexpanded_frames: usize,
}

/// Model plus diagnostics.
#[derive(Clone, Debug, Default)]
pub struct AdapterOutput {
	/// Nodes and links ready for the simulator.
	pub model: GraphModel,
	/// What was skipped or merged on the way.
	pub report: AdapterReport,
}

/// Builds the node/link model for `payload`. Deterministic for equal input.
pub fn build_graph(payload: &EnvironmentPayload, options: &AdapterOptions) -> AdapterOutput {
	let mut report = AdapterReport::default();
	let mut known: HashSet<&str> = HashSet::new();
	let mut accepted: Vec<(&str, &EntityRecord)> = Vec::new();

	for entity in &payload.entities {
		let Some(id) = entity.id.as_ref().filter(|id| !id.is_blank()) else {
			report.skipped_entities += 1;
			continue;
		};
		if !known.insert(id.as_str()) {
			report.duplicate_entities += 1;
			continue;
		}
		accepted.push((id.as_str(), entity));
	}

	let mut model = GraphModel::default();
	for (entity_id, entity) in &accepted {
		let node_id = entity_node_id(entity_id);
		let mut entity_node = Node {
			id: node_id.clone(),
			label: display_name(&entity.name, entity_id),
			kind: NodeKind::Entity,
			payload: NodePayload::Entity {
				id: entity_id.to_string(),
				name: entity.name.clone(),
			},
			position: None,
			pinned: None,
			pins: Vec::new(),
		};
		let mut frame_nodes = Vec::new();

		for frame_ref in &entity.frames {
			let frame = match frame_ref {
				FrameRef::Embedded(frame) => frame,
				FrameRef::Id(_) => {
					report.unexpanded_frames += 1;
					continue;
				}
			};

			let owner: &mut Node = if options.frame_nodes {
				let frame_id = frame_node_id(frame.id.as_str());
				model.links.push(Link {
					source_id: node_id.clone(),
					target_id: frame_id.clone(),
					kind: FRAME_LINK.to_string(),
					label: None,
				});
				frame_nodes.push(Node {
					id: frame_id,
					label: display_name(&frame.name, frame.id.as_str()),
					kind: NodeKind::Frame,
					payload: NodePayload::Frame {
						id: frame.id.to_string(),
						name: frame.name.clone(),
						entity_id: entity_id.to_string(),
					},
					position: None,
					pinned: None,
					pins: Vec::new(),
				});
				let last = frame_nodes.len() - 1;
				&mut frame_nodes[last]
			} else {
				&mut entity_node
			};

			attach_frame(owner, frame, entity_id, &known, &mut model.links, &mut report);
		}

		model.nodes.push(entity_node);
		model.nodes.append(&mut frame_nodes);
	}

	let dropped = model.normalize();
	debug_assert_eq!(dropped, 0, "adapter produced dangling links");

	if report.skipped_entities > 0 || report.duplicate_entities > 0 {
		warn!(
			"frame-graph: skipped {} entities without id and {} duplicates",
			report.skipped_entities, report.duplicate_entities
		);
	}
	if report.unresolved_references > 0 || report.unexpanded_frames > 0 {
		debug!(
			"frame-graph: {} unresolved element references, {} unexpanded frames",
			report.unresolved_references, report.unexpanded_frames
		);
	}

	AdapterOutput { model, report }
}

/// Adds the frame's elements as pins on `owner` and emits their role links.
fn attach_frame(
	owner: &mut Node,
	frame: &FrameRecord,
	entity_id: &str,
	known: &HashSet<&str>,
	links: &mut Vec<Link>,
	report: &mut AdapterReport,
) {
	for element in &frame.elements {
		owner.pins.push(Pin {
			id: element.id.to_string(),
			owner_node_id: owner.id.clone(),
			frame_id: frame.id.to_string(),
			name: element.name.clone(),
			definition: element.definition.clone(),
			angle_index: owner.pins.len(),
		});

		let Some(target) = element.entity_reference() else {
			continue;
		};
		if target == entity_id {
			report.self_references += 1;
		} else if known.contains(target.as_str()) {
			links.push(Link {
				source_id: owner.id.clone(),
				target_id: entity_node_id(&target),
				kind: ELEMENT_LINK.to_string(),
				label: Some(element.name.clone()),
			});
		} else {
			report.unresolved_references += 1;
		}
	}
}

fn display_name(name: &str, fallback: &str) -> String {
	if name.trim().is_empty() {
		fallback.to_string()
	} else {
		name.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	fn payload(value: serde_json::Value) -> EnvironmentPayload {
		serde_json::from_value(value).unwrap()
	}

	fn jury_and_player() -> EnvironmentPayload {
		payload(json!([
			{"id": "1", "name": "Jury"},
			{"id": "2", "name": "Player", "frames": [
				{"id": "f1", "elements": [{"id": "e1", "name": "addressee", "value": "1"}]}
			]}
		]))
	}

	#[test]
	fn jury_and_player_yield_one_addressee_link() {
		let out = build_graph(&jury_and_player(), &AdapterOptions::default());
		let ids: Vec<&str> = out.model.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["entity-1", "entity-2"]);
		assert_eq!(
			out.model.links,
			vec![Link {
				source_id: "entity-2".into(),
				target_id: "entity-1".into(),
				kind: ELEMENT_LINK.into(),
				label: Some("addressee".into()),
			}]
		);
		let player = out.model.node("entity-2").unwrap();
		assert_eq!(player.pins.len(), 1);
		assert_eq!(player.pins[0].frame_id, "f1");
	}

	#[test]
	fn entities_without_id_are_excluded_and_counted() {
		let out = build_graph(
			&payload(json!([
				{"name": "nameless"},
				{"id": "", "name": "blank"},
				{"id": 5, "name": "five"},
				{"id": "5", "name": "five again"}
			])),
			&AdapterOptions::default(),
		);
		assert_eq!(out.model.nodes.len(), 1);
		assert_eq!(out.model.nodes[0].label, "five");
		assert_eq!(out.report.skipped_entities, 2);
		assert_eq!(out.report.duplicate_entities, 1);
	}

	#[test]
	fn unresolved_and_self_references_produce_no_links() {
		let out = build_graph(
			&payload(json!([
				{"id": "a", "frames": [{"id": "f", "elements": [
					{"id": "e1", "name": "theme", "value": "missing"},
					{"id": "e2", "name": "self", "value": "a"},
					{"id": "e3", "name": "empty"}
				]}]}
			])),
			&AdapterOptions::default(),
		);
		assert!(out.model.links.is_empty());
		assert_eq!(out.report.unresolved_references, 1);
		assert_eq!(out.report.self_references, 1);
		assert_eq!(out.model.nodes[0].pins.len(), 3);
		let indices: Vec<usize> = out.model.nodes[0].pins.iter().map(|p| p.angle_index).collect();
		assert_eq!(indices, vec![0, 1, 2]);
	}

	#[test]
	fn bare_frame_ids_are_counted_not_expanded() {
		let out = build_graph(
			&payload(json!([{"id": "a", "frames": [3, 4]}])),
			&AdapterOptions::default(),
		);
		assert_eq!(out.report.unexpanded_frames, 2);
		assert!(out.model.nodes[0].pins.is_empty());
	}

	#[test]
	fn repeated_runs_are_structurally_identical() {
		let first = build_graph(&jury_and_player(), &AdapterOptions::default());
		let second = build_graph(&jury_and_player(), &AdapterOptions::default());
		assert_eq!(first.model, second.model);
		assert_eq!(first.report, second.report);
	}

	#[test]
	fn frame_nodes_carry_pins_and_links() {
		let out = build_graph(&jury_and_player(), &AdapterOptions { frame_nodes: true });
		let ids: Vec<&str> = out.model.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["entity-1", "entity-2", "frame-f1"]);
		let frame = out.model.node("frame-f1").unwrap();
		assert_eq!(frame.kind, NodeKind::Frame);
		assert_eq!(frame.pins.len(), 1);
		assert!(out.model.node("entity-2").unwrap().pins.is_empty());
		let kinds: Vec<(&str, &str, &str)> = out
			.model
			.links
			.iter()
			.map(|l| (l.source_id.as_str(), l.target_id.as_str(), l.kind.as_str()))
			.collect();
		assert_eq!(
			kinds,
			vec![
				("entity-2", "frame-f1", FRAME_LINK),
				("frame-f1", "entity-1", ELEMENT_LINK),
			]
		);
	}
}
