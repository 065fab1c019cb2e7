//! Per-canvas state and the frame pipeline.
//!
//! [`ForceGraphState`] owns the model, the simulator, the viewport, the
//! selection, the gesture machine, and the render scene. The host feeds it
//! input events as they arrive and calls [`ForceGraphState::frame`] once per
//! animation frame. Within a frame a queued data snapshot is folded in
//! first, then the viewport animation advances, then the simulator ticks,
//! and finally the render scene is refreshed from the new positions.
//!
//! Nothing here touches the browser. Requests that need the outside world
//! (selection callbacks, prompts, network submits, toasts, reloads) come
//! back as [`HostAction`]s.

use log::{debug, info};

use super::adapter::{AdapterOptions, AdapterReport, build_graph};
use super::assignment::{
	GestureEffect, GestureEvent, GestureMachine, GestureState, Modifiers, NodeHit, Notification,
	resolve_assignment,
};
use super::interaction::{InteractionController, SelectionChange};
use super::model::{GraphModel, NodePayload, Point};
use super::scale::{ScaleConfig, ScaledValues};
use super::scheduler::TickScheduler;
use super::simulation::LayoutSimulator;
use super::sync::RenderSync;
use super::types::{AssignFrameElement, EnvironmentPayload};
use super::viewport::ViewportController;
use crate::config::CanvasConfig;
use crate::error::GraphError;

/// Something the host has to do on behalf of the canvas.
#[derive(Clone, Debug, PartialEq)]
pub enum HostAction {
	/// Selection changed; `None` when cleared.
	EntitySelected(Option<NodePayload>),
	/// Ask for the role name of an assignment.
	Prompt {
		/// Label of the dragged node.
		source_label: String,
		/// Label of the drop target.
		target_label: String,
		/// Element names on the dragged node, offered as suggestions.
		roles: Vec<String>,
		/// Name of the pin the drag started on.
		preset: Option<String>,
	},
	/// Hide the role prompt.
	ClosePrompt,
	/// Send the mutation, then report back through
	/// [`ForceGraphState::assignment_finished`].
	Submit(AssignFrameElement),
	/// Show a toast.
	Notify(Notification),
	/// Reload the environment and queue the result.
	Refresh,
}

/// Everything the canvas knows between frames: graph, layout, viewport, and gestures.
///
/// The host feeds it input and animation frames and carries out the returned
/// [`HostAction`]s. It never touches the DOM.
pub struct ForceGraphState {
	environment_id: String,
	adapter: AdapterOptions,
	scale: ScaleConfig,
	model: GraphModel,
	pending: Option<GraphModel>,
	simulator: LayoutSimulator,
	viewport: ViewportController,
	interaction: InteractionController,
	gestures: GestureMachine,
	sync: RenderSync,
	torn_down: bool,
}

impl ForceGraphState {
	/// A canvas of `width` by `height` pixels with no graph loaded.
	pub fn new(
		config: &CanvasConfig,
		width: f64,
		height: f64,
		scheduler: Box<dyn TickScheduler>,
	) -> Self {
		let mut simulator = LayoutSimulator::new(config.simulation.clone(), scheduler);
		simulator.set_center(Point::new(width / 2.0, height / 2.0));
		Self {
			environment_id: config.environment_id.clone(),
			adapter: AdapterOptions {
				frame_nodes: config.frame_nodes,
			},
			scale: config.scale.clone(),
			model: GraphModel::default(),
			pending: None,
			simulator,
			viewport: ViewportController::new(config.viewport.clone(), width, height),
			interaction: InteractionController::new(config.interaction.clone()),
			gestures: GestureMachine::new(config.gesture.clone()),
			sync: RenderSync::new(config.scale.node_radius, config.scale.pin_offset),
			torn_down: false,
		}
	}

	/// Environment being shown.
	pub fn environment_id(&self) -> &str {
		&self.environment_id
	}

	/// Switches the environment reported in assignments.
	pub fn set_environment(&mut self, environment_id: &str) {
		self.environment_id = environment_id.to_string();
	}

	/// Graph currently on screen.
	pub fn model(&self) -> &GraphModel {
		&self.model
	}

	/// Render scene for the painter.
	pub fn scene(&self) -> &RenderSync {
		&self.sync
	}

	/// Pan and zoom.
	pub fn viewport(&self) -> &ViewportController {
		&self.viewport
	}

	/// The force layout.
	pub fn simulator(&self) -> &LayoutSimulator {
		&self.simulator
	}

	/// Zoom-dependent sizes.
	pub fn scale(&self) -> &ScaleConfig {
		&self.scale
	}

	/// Id of the selected node.
	pub fn selected(&self) -> Option<&str> {
		self.interaction.selected()
	}

	/// Where the drag gesture is.
	pub fn gesture_state(&self) -> &GestureState {
		self.gestures.state()
	}

	/// Whether [`teardown`](Self::teardown) ran.
	pub fn is_torn_down(&self) -> bool {
		self.torn_down
	}

	/// Converts `payload` and queues it for the next frame.
	pub fn load_payload(&mut self, payload: &EnvironmentPayload) -> AdapterReport {
		let output = build_graph(payload, &self.adapter);
		self.queue_snapshot(output.model);
		output.report
	}

	/// Queues a model for the next frame. Positions carried by the model
	/// seed nodes the canvas has not placed yet.
	pub fn queue_snapshot(&mut self, mut model: GraphModel) {
		if self.torn_down {
			return;
		}
		model.normalize();
		if let Some(previous) = &self.pending {
			model.inherit_positions(previous);
		}
		self.pending = Some(model);
		self.simulator.request_frame();
	}

	/// Runs one frame. Returns host actions raised by the data fold.
	pub fn frame(&mut self, now_ms: f64) -> Vec<HostAction> {
		if self.torn_down {
			return Vec::new();
		}
		let actions = self.fold_pending();
		if self.viewport.advance(now_ms) {
			self.simulator.request_frame();
		}
		self.simulator.tick();
		self.refresh_scene();
		actions
	}

	/// Whether another frame should be scheduled.
	pub fn needs_frame(&self) -> bool {
		!self.torn_down
			&& (self.pending.is_some()
				|| self.simulator.is_running()
				|| self.viewport.is_animating())
	}

	fn fold_pending(&mut self) -> Vec<HostAction> {
		let Some(next) = self.pending.take() else {
			return Vec::new();
		};
		let mut actions = Vec::new();

		let dragged_gone = self
			.gestures
			.dragged_node()
			.is_some_and(|id| next.node(id).is_none());
		if dragged_gone {
			let effects = self.gestures.dispatch(GestureEvent::Cancel);
			actions.extend(self.apply_effects(effects));
		}

		let seeded = self.simulator.set_graph(&next);
		self.model = next;
		self.simulator.export_positions(&mut self.model);
		let diff = self.sync.reconcile(&self.model);
		info!(
			"frame-graph: snapshot with {} nodes, {} links (+{} -{} ={})",
			self.model.nodes.len(),
			self.model.links.len(),
			seeded.added,
			seeded.removed,
			diff.retained
		);

		let model = &self.model;
		if self.interaction.retain_selection(|id| model.node(id).is_some()) {
			actions.push(HostAction::EntitySelected(None));
		}
		self.sync.apply_selection(&self.interaction);
		self.refresh_scene();
		actions
	}

	/// The environment could not be loaded. The previous graph leaves the
	/// scene, any gesture is abandoned, and the layout stays stopped until
	/// the next snapshot arrives.
	pub fn load_failed(&mut self) -> Vec<HostAction> {
		if self.torn_down {
			return Vec::new();
		}
		let mut actions = if self.gestures.is_idle() {
			Vec::new()
		} else {
			let effects = self.gestures.dispatch(GestureEvent::Cancel);
			self.apply_effects(effects)
		};
		if self.interaction.retain_selection(|_| false) {
			actions.push(HostAction::EntitySelected(None));
		}
		self.pending = None;
		self.model = GraphModel::default();
		self.simulator.set_graph(&self.model);
		self.simulator.stop();
		self.sync.clear();
		info!("frame-graph: load failed, scene cleared");
		// one more paint to wipe the canvas
		self.redraw();
		actions
	}

	/// Current model with live positions, for handing to a remounted canvas.
	pub fn snapshot(&self) -> GraphModel {
		let mut model = self.pending.clone().unwrap_or_else(|| self.model.clone());
		self.simulator.export_positions(&mut model);
		model
	}

	/// Stops the simulator and cancels the pending frame. Later input and
	/// snapshots are ignored.
	pub fn teardown(&mut self) {
		if self.torn_down {
			return;
		}
		self.torn_down = true;
		self.pending = None;
		self.simulator.stop();
		self.sync.set_preview(None);
		debug!("frame-graph: canvas torn down after {} ticks", self.simulator.ticks());
	}

	/// Resizes the canvas and recentres the layout.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.resize(width, height);
		self.simulator.set_center(Point::new(width / 2.0, height / 2.0));
		self.redraw();
	}

	fn redraw(&mut self) {
		if !self.torn_down {
			self.simulator.request_frame();
		}
	}

	/// Pulls positions into the scene at the current zoom.
	fn refresh_scene(&mut self) {
		let node_radius = self.scaled().node_radius;
		self.sync.update(&self.simulator, self.viewport.transform(), node_radius);
	}

	fn scaled(&self) -> ScaledValues {
		ScaledValues::new(&self.scale, self.viewport.transform().scale)
	}

	/// Pin under `world` first, then node body.
	fn hit_test(&self, world: Point) -> Option<NodeHit> {
		let scaled = self.scaled();
		let (node_id, pin_id) = match self.sync.pin_at(world, scaled.pin_hit_radius) {
			Some((node, pin)) => (node.id.clone(), Some(pin.id.clone())),
			None => (self.sync.node_at(world, scaled.node_radius, None)?.id.clone(), None),
		};
		Some(NodeHit {
			node_position: self.simulator.position(&node_id)?,
			pinned: self.simulator.pinned(&node_id),
			node_id,
			pin_id,
		})
	}

	/// Press at `screen`. Starts a click or a drag.
	pub fn pointer_down(&mut self, screen: Point, now_ms: f64) -> Vec<HostAction> {
		if self.torn_down || !self.gestures.is_idle() {
			return Vec::new();
		}
		let world = self.viewport.to_world(screen);
		let hit = self.hit_test(world);
		self.interaction
			.pointer_down(hit.as_ref().map(|h| h.node_id.as_str()), screen, now_ms);
		if hit.is_none() {
			self.viewport.begin_pan(screen);
		}
		let effects = self.gestures.dispatch(GestureEvent::PointerDown { hit, world, screen });
		self.apply_effects(effects)
	}

	/// Pointer moved to `screen`.
	pub fn pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> Vec<HostAction> {
		if self.torn_down {
			return Vec::new();
		}
		self.interaction.pointer_move(screen);
		if self.gestures.holds_pointer() {
			let world = self.viewport.to_world(screen);
			let effects = self.gestures.dispatch(GestureEvent::PointerMove {
				world,
				screen,
				modifiers,
			});
			return self.apply_effects(effects);
		}
		if self.viewport.is_panning() {
			self.viewport.pan_move(screen);
			self.redraw();
		}
		Vec::new()
	}

	/// Release at `screen`. Finishes a click, a drop, or a drag.
	pub fn pointer_up(&mut self, screen: Point, now_ms: f64) -> Vec<HostAction> {
		if self.torn_down {
			return Vec::new();
		}
		let mut actions = Vec::new();
		if self.gestures.holds_pointer() {
			let world = self.viewport.to_world(screen);
			let radius = self.gestures.config().drop_radius / self.viewport.transform().scale;
			let drop_target = self
				.sync
				.node_at(world, radius, self.gestures.dragged_node())
				.map(|v| v.id.clone());
			let effects = self.gestures.dispatch(GestureEvent::PointerUp { world, drop_target });
			actions.extend(self.apply_effects(effects));
		}
		self.viewport.end_pan();

		if let Some(change) = self.interaction.pointer_up(screen, now_ms) {
			let payload = match &change {
				SelectionChange::Selected(id) => self.model.node(id).map(|n| n.payload.clone()),
				SelectionChange::Cleared => None,
			};
			self.sync.apply_selection(&self.interaction);
			actions.push(HostAction::EntitySelected(payload));
			self.redraw();
		}
		actions
	}

	/// Pointer left the canvas: abandon whatever was in progress.
	pub fn pointer_leave(&mut self) -> Vec<HostAction> {
		self.interaction.cancel_press();
		self.viewport.end_pan();
		if self.gestures.holds_pointer() {
			let effects = self.gestures.dispatch(GestureEvent::Cancel);
			return self.apply_effects(effects);
		}
		Vec::new()
	}

	/// Zooms around `screen`.
	pub fn wheel(&mut self, delta_y: f64, screen: Point) {
		self.viewport.wheel(delta_y, screen);
		self.redraw();
	}

	/// Second finger down: any press or drag in progress is abandoned.
	pub fn pinch_start(&mut self, a: Point, b: Point) -> Vec<HostAction> {
		let actions = self.pointer_leave();
		self.viewport.begin_pinch(a, b);
		actions
	}

	/// Zooms and pans with two touches.
	pub fn pinch_move(&mut self, a: Point, b: Point) {
		self.viewport.update_pinch(a, b);
		self.redraw();
	}

	/// Ends a pinch.
	pub fn pinch_end(&mut self) {
		self.viewport.end_pinch();
	}

	/// Zooms in one step around the centre.
	pub fn zoom_in(&mut self) {
		self.viewport.zoom_in();
		self.redraw();
	}

	/// Zooms out one step around the centre.
	pub fn zoom_out(&mut self) {
		self.viewport.zoom_out();
		self.redraw();
	}

	/// Animates back to the identity transform.
	pub fn reset_zoom(&mut self) {
		self.viewport.reset_zoom();
		self.redraw();
	}

	/// Animates to a view showing every node.
	pub fn fit(&mut self) {
		if let Some((min, max)) = self.sync.bounds() {
			self.viewport.fit_to(min, max);
			self.redraw();
		}
	}

	/// Centres the view on world point `(x, y)`.
	pub fn pan_to(&mut self, x: f64, y: f64) {
		self.viewport.pan_to(x, y);
		self.redraw();
	}

	/// Confirms the open role prompt with `role`.
	pub fn confirm_assignment(&mut self, role: &str) -> Vec<HostAction> {
		let effects = self.gestures.dispatch(GestureEvent::Confirm {
			role: role.to_string(),
		});
		self.apply_effects(effects)
	}

	/// Dismisses the role prompt or aborts the drag.
	pub fn cancel_assignment(&mut self) -> Vec<HostAction> {
		let effects = self.gestures.dispatch(GestureEvent::Cancel);
		self.apply_effects(effects)
	}

	/// Reports the outcome of a [`HostAction::Submit`].
	pub fn assignment_finished(&mut self, result: Result<(), GraphError>) -> Vec<HostAction> {
		let event = match result {
			Ok(()) => GestureEvent::CommitSucceeded,
			Err(err) => GestureEvent::CommitFailed {
				message: err.user_message(),
			},
		};
		let effects = self.gestures.dispatch(event);
		self.apply_effects(effects)
	}

	fn apply_effects(&mut self, effects: Vec<GestureEffect>) -> Vec<HostAction> {
		let mut actions = Vec::new();
		let mut queue = std::collections::VecDeque::from(effects);
		while let Some(effect) = queue.pop_front() {
			match effect {
				GestureEffect::Pin { node_id, at } => {
					self.simulator.pin(&node_id, at);
				}
				GestureEffect::RestorePin { node_id, pinned } => {
					self.simulator.restore_pin(&node_id, pinned);
				}
				GestureEffect::Place { node_id, at } => self.simulator.place(&node_id, at),
				GestureEffect::BeginDrag => self.simulator.begin_drag(),
				GestureEffect::EndDrag => self.simulator.end_drag(),
				GestureEffect::Preview(line) => self.sync.set_preview(line),
				GestureEffect::Prompt {
					source_node_id,
					target_node_id,
				} => actions.push(self.prompt(&source_node_id, &target_node_id)),
				GestureEffect::ClosePrompt => actions.push(HostAction::ClosePrompt),
				GestureEffect::Submit(intent) => {
					match resolve_assignment(&self.model, &intent, &self.environment_id) {
						Ok(body) => actions.push(HostAction::Submit(body)),
						Err(err) => queue.extend(self.gestures.dispatch(GestureEvent::CommitFailed {
							message: err.user_message(),
						})),
					}
				}
				GestureEffect::Notify(notification) => {
					actions.push(HostAction::Notify(notification));
				}
				GestureEffect::Refresh => actions.push(HostAction::Refresh),
				GestureEffect::Aborted => debug!("frame-graph: assignment drag aborted"),
			}
		}
		self.redraw();
		actions
	}

	fn prompt(&self, source_node_id: &str, target_node_id: &str) -> HostAction {
		let label = |id: &str| {
			self.model
				.node(id)
				.map_or_else(|| id.to_string(), |n| n.label.clone())
		};
		let pins = self
			.model
			.node(source_node_id)
			.map(|n| n.pins.as_slice())
			.unwrap_or_default();
		let preset = match self.gestures.state() {
			GestureState::AwaitingConfirmation {
				pin_id: Some(pin_id),
				..
			} => pins.iter().find(|p| &p.id == pin_id).map(|p| p.name.clone()),
			_ => None,
		};
		HostAction::Prompt {
			source_label: label(source_node_id),
			target_label: label(target_node_id),
			roles: pins.iter().map(|p| p.name.clone()).collect(),
			preset,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::assignment::NotificationKind;
	use crate::components::force_graph::scheduler::ManualScheduler;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	const W: f64 = 800.0;
	const H: f64 = 600.0;

	fn state() -> (ForceGraphState, ManualScheduler) {
		let scheduler = ManualScheduler::new();
		let config = CanvasConfig {
			environment_id: "env-1".into(),
			..CanvasConfig::default()
		};
		(ForceGraphState::new(&config, W, H, Box::new(scheduler.clone())), scheduler)
	}

	fn payload(value: serde_json::Value) -> EnvironmentPayload {
		serde_json::from_value(value).unwrap()
	}

	fn jury_player_judge() -> EnvironmentPayload {
		payload(json!([
			{"id": "1", "name": "Jury"},
			{"id": "2", "name": "Player", "frames": [
				{"id": "f1", "elements": [
					{"id": "e1", "name": "addressee", "value": "1"},
					{"id": "e2", "name": "judge"}
				]}
			]},
			{"id": "3", "name": "Judge"}
		]))
	}

	fn settle(state: &mut ForceGraphState) {
		let mut now = 0.0;
		state.frame(now);
		while state.needs_frame() {
			now += 16.0;
			state.frame(now);
			assert!(now < 60_000.0, "layout did not settle");
		}
	}

	/// Places nodes at fixed spots far apart so hit tests are predictable.
	fn arrange(state: &mut ForceGraphState) {
		let spots = [
			("entity-1", 100.0, 100.0),
			("entity-2", 400.0, 300.0),
			("entity-3", 700.0, 500.0),
		];
		for (id, x, y) in spots {
			state.simulator.pin(id, Point::new(x, y));
		}
		state.refresh_scene();
	}

	fn loaded() -> ForceGraphState {
		let (mut s, _) = state();
		s.load_payload(&jury_player_judge());
		settle(&mut s);
		arrange(&mut s);
		s
	}

	fn shift() -> Modifiers {
		Modifiers {
			shift: true,
			..Modifiers::default()
		}
	}

	#[test]
	fn snapshot_fold_preserves_positions_of_retained_ids() {
		let (mut s, _) = state();
		s.load_payload(&jury_player_judge());
		settle(&mut s);
		let before = s.simulator.position("entity-1").unwrap();

		s.load_payload(&payload(json!([
			{"id": "1", "name": "Jury"},
			{"id": "4", "name": "Audience"}
		])));
		s.fold_pending();
		assert_eq!(s.simulator.position("entity-1"), Some(before));
		assert_eq!(s.scene().node("entity-1").unwrap().position, before);
		assert!(s.scene().node("entity-2").is_none());
		assert!(s.scene().node("entity-4").is_some());
		assert!(s.scene().links().is_empty());
	}

	#[test]
	fn refresh_that_only_adds_a_link_reheats_the_layout() {
		let (mut s, scheduler) = state();
		s.load_payload(&jury_player_judge());
		settle(&mut s);
		scheduler.take();
		let judge = s.simulator.position("entity-3").unwrap();

		s.load_payload(&payload(json!([
			{"id": "1", "name": "Jury"},
			{"id": "2", "name": "Player", "frames": [
				{"id": "f1", "elements": [
					{"id": "e1", "name": "addressee", "value": "1"},
					{"id": "e2", "name": "judge", "value": "3"}
				]}
			]},
			{"id": "3", "name": "Judge"}
		])));
		s.frame(10_000.0);
		assert_eq!(s.scene().links().len(), 2);
		assert!(s.simulator().is_running());
		assert!(s.needs_frame());
		assert!(scheduler.is_pending());
		assert_ne!(s.simulator.position("entity-3"), Some(judge));
	}

	#[test]
	fn failed_load_clears_the_scene_and_stops_the_layout() {
		let (mut s, scheduler) = state();
		s.load_payload(&jury_player_judge());
		s.frame(0.0);
		assert!(s.simulator().is_running());
		s.load_payload(&jury_player_judge());

		let actions = s.load_failed();
		assert!(actions.is_empty());
		assert!(!s.simulator().is_running());
		assert!(s.scene().nodes().is_empty());
		assert!(s.scene().links().is_empty());
		assert!(s.model().nodes.is_empty());
		assert!(!s.needs_frame());
		assert!(scheduler.take());

		let ticks = s.simulator().ticks();
		s.frame(16.0);
		assert_eq!(s.simulator().ticks(), ticks);
		assert!(s.scene().nodes().is_empty());

		s.load_payload(&jury_player_judge());
		s.frame(32.0);
		assert_eq!(s.scene().nodes().len(), 3);
		assert!(s.simulator().is_running());
	}

	#[test]
	fn failed_load_drops_the_selection() {
		let mut s = loaded();
		s.pointer_down(Point::new(100.0, 100.0), 0.0);
		s.pointer_up(Point::new(100.0, 100.0), 10.0);
		assert_eq!(s.selected(), Some("entity-1"));
		assert_eq!(s.load_failed(), vec![HostAction::EntitySelected(None)]);
		assert_eq!(s.selected(), None);
	}

	#[test]
	fn rendered_node_count_matches_distinct_ids() {
		let (mut s, _) = state();
		let report = s.load_payload(&payload(json!([
			{"id": "a"}, {"id": "a"}, {"name": "anonymous"}, {"id": 7}
		])));
		s.frame(0.0);
		assert_eq!(s.scene().nodes().len(), 2);
		assert_eq!(report.skipped_entities, 1);
		assert_eq!(report.duplicate_entities, 1);
	}

	#[test]
	fn click_selects_and_highlights() {
		let mut s = loaded();
		let actions = s.pointer_down(Point::new(400.0, 300.0), 0.0);
		assert!(actions.is_empty());
		let actions = s.pointer_up(Point::new(401.0, 300.0), 60.0);
		assert_eq!(
			actions,
			vec![HostAction::EntitySelected(Some(NodePayload::Entity {
				id: "2".into(),
				name: "Player".into()
			}))]
		);
		assert_eq!(s.selected(), Some("entity-2"));
		assert!(s.scene().links().iter().all(|l| l.highlighted));

		s.pointer_down(Point::new(250.0, 50.0), 100.0);
		let actions = s.pointer_up(Point::new(250.0, 50.0), 150.0);
		assert_eq!(actions, vec![HostAction::EntitySelected(None)]);
		assert!(s.scene().links().iter().all(|l| !l.highlighted));
	}

	#[test]
	fn plain_drag_onto_a_node_repositions_without_prompting() {
		let mut s = loaded();
		s.simulator.unpin("entity-2");
		let mut actions = s.pointer_down(Point::new(400.0, 300.0), 0.0);
		actions.extend(s.pointer_move(Point::new(550.0, 400.0), Modifiers::default()));
		assert_eq!(s.simulator.pinned("entity-2"), Some(Point::new(550.0, 400.0)));
		actions.extend(s.pointer_move(Point::new(700.0, 500.0), Modifiers::default()));
		actions.extend(s.pointer_up(Point::new(700.0, 500.0), 400.0));
		assert!(actions.is_empty(), "{actions:?}");
		assert_eq!(s.simulator.pinned("entity-2"), None);
		assert!(s.gesture_state() == &GestureState::Idle);
	}

	#[test]
	fn assignment_drag_to_background_changes_nothing() {
		let mut s = loaded();
		let links = s.model().links.clone();
		let pins: Vec<_> = ["entity-1", "entity-2", "entity-3"]
			.iter()
			.map(|id| s.simulator.pinned(id))
			.collect();

		s.pointer_down(Point::new(400.0, 300.0), 0.0);
		s.pointer_move(Point::new(250.0, 450.0), shift());
		assert!(s.scene().preview().is_some());
		let actions = s.pointer_up(Point::new(250.0, 450.0), 300.0);

		assert!(actions.is_empty());
		assert!(s.scene().preview().is_none());
		assert_eq!(s.model().links, links);
		let after: Vec<_> = ["entity-1", "entity-2", "entity-3"]
			.iter()
			.map(|id| s.simulator.pinned(id))
			.collect();
		assert_eq!(after, pins);
	}

	fn drag_player_onto_judge(s: &mut ForceGraphState) -> Vec<HostAction> {
		s.pointer_down(Point::new(400.0, 300.0), 0.0);
		s.pointer_move(Point::new(600.0, 450.0), shift());
		s.pointer_move(Point::new(690.0, 495.0), shift());
		s.pointer_up(Point::new(690.0, 495.0), 500.0)
	}

	#[test]
	fn assignment_round_trip() {
		let mut s = loaded();
		let actions = drag_player_onto_judge(&mut s);
		assert_eq!(
			actions,
			vec![HostAction::Prompt {
				source_label: "Player".into(),
				target_label: "Judge".into(),
				roles: vec!["addressee".into(), "judge".into()],
				preset: None,
			}]
		);
		assert_eq!(s.simulator.position("entity-2"), Some(Point::new(400.0, 300.0)));

		let actions = s.confirm_assignment("judge");
		assert_eq!(
			actions,
			vec![
				HostAction::ClosePrompt,
				HostAction::Submit(AssignFrameElement {
					frame_id: "f1".into(),
					element_id: "e2".into(),
					role: "judge".into(),
					environment_id: "env-1".into(),
					value: "3".into(),
				})
			]
		);

		let actions = s.assignment_finished(Ok(()));
		assert!(matches!(
			&actions[0],
			HostAction::Notify(n) if n.kind == NotificationKind::Success
		));
		assert_eq!(actions[1], HostAction::Refresh);
	}

	#[test]
	fn rejected_assignment_leaves_the_graph_alone() {
		let mut s = loaded();
		let before = s.model().clone();
		drag_player_onto_judge(&mut s);
		s.confirm_assignment("judge");
		let actions = s.assignment_finished(Err(GraphError::AssignmentRejected {
			detail: "frame locked".into(),
		}));
		assert_eq!(
			actions,
			vec![HostAction::Notify(Notification::error(
				"Assignment failed: frame locked"
			))]
		);
		assert_eq!(s.model().links, before.links);
		assert_eq!(s.gesture_state(), &GestureState::Idle);
	}

	#[test]
	fn unknown_role_fails_without_submitting() {
		let mut s = loaded();
		drag_player_onto_judge(&mut s);
		let actions = s.confirm_assignment("witness");
		assert_eq!(actions.len(), 2);
		assert_eq!(actions[0], HostAction::ClosePrompt);
		assert!(matches!(
			&actions[1],
			HostAction::Notify(n)
				if n.kind == NotificationKind::Error && n.message.contains("witness")
		));
		assert_eq!(s.gesture_state(), &GestureState::Idle);
	}

	#[test]
	fn teardown_cancels_frames_and_ignores_late_data() {
		let (mut s, scheduler) = state();
		s.load_payload(&jury_player_judge());
		s.frame(0.0);
		assert!(s.needs_frame());
		s.teardown();
		assert!(!s.needs_frame());
		assert!(!scheduler.is_pending());
		assert_eq!(scheduler.cancellations(), 1);

		s.load_payload(&jury_player_judge());
		assert!(s.frame(16.0).is_empty());
		assert!(!s.needs_frame());
	}

	#[test]
	fn remount_from_snapshot_restores_positions() {
		let (mut first, _) = state();
		first.load_payload(&jury_player_judge());
		settle(&mut first);
		let snapshot = first.snapshot();
		let at = first.simulator.position("entity-2").unwrap();
		first.teardown();

		let (mut second, _) = state();
		second.queue_snapshot(snapshot);
		second.load_payload(&jury_player_judge());
		second.fold_pending();
		assert_eq!(second.simulator.position("entity-2"), Some(at));
	}

	#[test]
	fn removing_the_selected_node_clears_selection() {
		let mut s = loaded();
		s.pointer_down(Point::new(100.0, 100.0), 0.0);
		s.pointer_up(Point::new(100.0, 100.0), 10.0);
		assert_eq!(s.selected(), Some("entity-1"));
		s.load_payload(&payload(json!([{"id": "2", "name": "Player"}])));
		assert_eq!(s.frame(0.0), vec![HostAction::EntitySelected(None)]);
		assert_eq!(s.selected(), None);
	}

	#[test]
	fn background_drag_pans() {
		let mut s = loaded();
		s.pointer_down(Point::new(250.0, 50.0), 0.0);
		s.pointer_move(Point::new(300.0, 80.0), Modifiers::default());
		s.pointer_up(Point::new(300.0, 80.0), 500.0);
		let t = s.viewport().transform();
		assert_eq!((t.translate_x, t.translate_y), (50.0, 30.0));
		assert_eq!(s.selected(), None);
	}
}
