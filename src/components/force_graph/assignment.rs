//! Drag gestures on nodes: repositioning and cross-node role assignment.
//!
//! A press on a node enters `PotentialDrag`. Once the pointer travels past
//! the drag threshold the gesture commits to one of two paths, decided by the
//! assignment modifier key at that moment:
//!
//! ```text
//! Idle -> PotentialDrag -+-> Repositioning ------------------------> Idle
//!                        |      (pin to pointer, release on drop)
//!                        +-> Dragging -> AwaitingConfirmation -> Committing -> Idle
//!                               |  drop off-target  |  cancel
//!                               +------> Idle <-----+
//! ```
//!
//! [`GestureMachine::dispatch`] is the only way in. It returns the side
//! effects the host must apply (pin changes, preview line, prompt, network
//! submit, notifications) so the machine itself stays free of I/O.

use log::{debug, info, warn};
use serde::Deserialize;

use super::model::{GraphModel, NodePayload, Point};
use super::types::AssignFrameElement;
use crate::error::GraphError;

/// Key that turns a node drag into an assignment drag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKey {
	/// The Shift key.
	#[default]
	Shift,
	/// The Alt (Option) key.
	Alt,
	/// The Control key.
	Ctrl,
	/// The Meta (Command) key.
	Meta,
}

/// Modifier keys held during a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
	/// Shift is held.
	pub shift: bool,
	/// Alt is held.
	pub alt: bool,
	/// Control is held.
	pub ctrl: bool,
	/// Meta is held.
	pub meta: bool,
}

impl Modifiers {
	/// Whether `key` is held.
	pub fn held(&self, key: ModifierKey) -> bool {
		match key {
			ModifierKey::Shift => self.shift,
			ModifierKey::Alt => self.alt,
			ModifierKey::Ctrl => self.ctrl,
			ModifierKey::Meta => self.meta,
		}
	}
}

/// Settings of the drag and assignment gestures.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GestureConfig {
	/// Drop hit radius around a target node, in screen pixels.
	pub drop_radius: f64,
	/// Pointer travel (screen pixels) before a press becomes a drag.
	pub drag_threshold: f64,
	/// Key that turns a drag into an assignment drag.
	pub modifier: ModifierKey,
}

impl Default for GestureConfig {
	fn default() -> Self {
		Self {
			drop_radius: 20.0,
			drag_threshold: 4.0,
			modifier: ModifierKey::Shift,
		}
	}
}

/// Node (and optionally pin) under the pointer when a gesture starts.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeHit {
	/// Node that was pressed.
	pub node_id: String,
	/// Element pin the press landed on, if any.
	pub pin_id: Option<String>,
	/// Node position in world units at press time.
	pub node_position: Point,
	/// Pin state at press time, restored when the gesture ends.
	pub pinned: Option<Point>,
}

/// A role assignment the user asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentIntent {
	/// Node the drag started on.
	pub source_node_id: String,
	/// Node the drag was dropped on.
	pub target_node_id: String,
	/// Role name typed by the user.
	pub role: String,
	/// Element pin the drag started on.
	pub pin_id: Option<String>,
}

/// Temporary line from a dragged node's origin to the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewLine {
	/// Origin of the drag.
	pub from: Point,
	/// Current pointer position.
	pub to: Point,
}

/// Tone of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
	/// The operation went through.
	Success,
	/// The operation failed.
	Error,
}

/// A short message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
	/// Success or error.
	pub kind: NotificationKind,
	/// Text shown to the user.
	pub message: String,
}

impl Notification {
	/// A success notification.
	pub fn success(message: impl Into<String>) -> Self {
		Self {
			kind: NotificationKind::Success,
			message: message.into(),
		}
	}

	/// An error notification.
	pub fn error(message: impl Into<String>) -> Self {
		Self {
			kind: NotificationKind::Error,
			message: message.into(),
		}
	}
}

/// Input to the gesture machine.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureEvent {
	/// Press at world point `world` / screen point `screen`. `hit` is `None` on the background.
	PointerDown {
		hit: Option<NodeHit>,
		world: Point,
		screen: Point,
	},
	/// Pointer moved, with the modifiers held at that moment.
	PointerMove {
		world: Point,
		screen: Point,
		modifiers: Modifiers,
	},
	/// Release. `drop_target` is the nearest other node within the drop radius.
	PointerUp {
		world: Point,
		drop_target: Option<String>,
	},
	/// User confirmed the prompt with a role name.
	Confirm {
		role: String,
	},
	/// Escape, prompt dismissed, or load reset.
	Cancel,
	/// The service accepted the assignment.
	CommitSucceeded,
	/// The service rejected the assignment or failed.
	CommitFailed {
		message: String,
	},
}

/// Side effect requested by a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureEffect {
	/// Fix the node at `at`.
	Pin { node_id: String, at: Point },
	/// Put the node's pin state back to what it was before the gesture.
	RestorePin { node_id: String, pinned: Option<Point> },
	/// Move the node without pinning.
	Place { node_id: String, at: Point },
	/// Keep the layout warm while a node is held.
	BeginDrag,
	/// Stop keeping the layout warm.
	EndDrag,
	/// Show, move, or hide the preview line.
	Preview(Option<PreviewLine>),
	/// Ask the user for a role name.
	Prompt {
		source_node_id: String,
		target_node_id: String,
	},
	/// Hide the role prompt.
	ClosePrompt,
	/// Send the assignment to the service.
	Submit(AssignmentIntent),
	/// Show a notification.
	Notify(Notification),
	/// Reload graph data after a successful mutation.
	Refresh,
	/// Assignment drag dropped away from any other node. Nothing is shown.
	Aborted,
}

/// Where the gesture machine is.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureState {
	/// No gesture in progress.
	Idle,
	/// A node is pressed but the pointer has not travelled far enough to drag.
	PotentialDrag {
		/// What was pressed.
		hit: NodeHit,
		/// Press position in world units.
		press_world: Point,
		/// Press position in screen pixels.
		press_screen: Point,
	},
	/// A plain drag moving a node.
	Repositioning {
		/// Node being moved.
		node_id: String,
		/// Node position minus pointer position at the press.
		grab_offset: Point,
		/// Pin state to restore on release.
		pinned: Option<Point>,
	},
	/// An assignment drag showing the preview line.
	Dragging {
		/// Node the drag started on.
		hit: NodeHit,
		/// Current pointer position in world units.
		pointer: Point,
	},
	/// Dropped on a target; the role prompt is open.
	AwaitingConfirmation {
		/// Node the drag started on.
		source_node_id: String,
		/// Node the drag was dropped on.
		target_node_id: String,
		/// Element pin the drag started on.
		pin_id: Option<String>,
	},
	/// The assignment was submitted and awaits the service.
	Committing(AssignmentIntent),
}

/// The drag/assignment state machine.
#[derive(Clone, Debug)]
pub struct GestureMachine {
	config: GestureConfig,
	state: GestureState,
}

impl GestureMachine {
	/// A machine in `Idle`.
	pub fn new(config: GestureConfig) -> Self {
		Self {
			config,
			state: GestureState::Idle,
		}
	}

	/// The settings this machine runs with.
	pub fn config(&self) -> &GestureConfig {
		&self.config
	}

	/// The current state.
	pub fn state(&self) -> &GestureState {
		&self.state
	}

	/// Whether no gesture is in progress.
	pub fn is_idle(&self) -> bool {
		self.state == GestureState::Idle
	}

	/// Whether the machine owns the pointer (the host must not pan or click).
	pub fn holds_pointer(&self) -> bool {
		matches!(
			self.state,
			GestureState::PotentialDrag { .. }
				| GestureState::Repositioning { .. }
				| GestureState::Dragging { .. }
		)
	}

	/// Node being dragged, for excluding it from drop hit tests.
	pub fn dragged_node(&self) -> Option<&str> {
		match &self.state {
			GestureState::PotentialDrag { hit, .. } | GestureState::Dragging { hit, .. } => {
				Some(&hit.node_id)
			}
			GestureState::Repositioning { node_id, .. } => Some(node_id),
			_ => None,
		}
	}

	/// Applies `event` and returns the effects of the transition.
	pub fn dispatch(&mut self, event: GestureEvent) -> Vec<GestureEffect> {
		use GestureEffect as E;
		use GestureState as S;

		let state = std::mem::replace(&mut self.state, S::Idle);
		let (next, effects) = match (state, event) {
			(S::Idle, GestureEvent::PointerDown { hit: Some(hit), world, screen }) => (
				S::PotentialDrag {
					hit,
					press_world: world,
					press_screen: screen,
				},
				vec![],
			),

			(
				S::PotentialDrag {
					hit,
					press_world,
					press_screen,
				},
				GestureEvent::PointerMove {
					world,
					screen,
					modifiers,
				},
			) => {
				if press_screen.distance(screen) < self.config.drag_threshold {
					(
						S::PotentialDrag {
							hit,
							press_world,
							press_screen,
						},
						vec![],
					)
				} else if modifiers.held(self.config.modifier) {
					debug!("frame-graph: assignment drag from {}", hit.node_id);
					let effects = vec![
						E::BeginDrag,
						E::Pin {
							node_id: hit.node_id.clone(),
							at: world,
						},
						E::Preview(Some(PreviewLine {
							from: hit.node_position,
							to: world,
						})),
					];
					(S::Dragging { hit, pointer: world }, effects)
				} else {
					let grab_offset = hit.node_position - press_world;
					let effects = vec![
						E::BeginDrag,
						E::Pin {
							node_id: hit.node_id.clone(),
							at: world + grab_offset,
						},
					];
					(
						S::Repositioning {
							node_id: hit.node_id,
							grab_offset,
							pinned: hit.pinned,
						},
						effects,
					)
				}
			}
			(S::PotentialDrag { .. }, GestureEvent::PointerUp { .. } | GestureEvent::Cancel) => {
				(S::Idle, vec![])
			}

			(
				S::Repositioning {
					node_id,
					grab_offset,
					pinned,
				},
				GestureEvent::PointerMove { world, .. },
			) => {
				let effects = vec![E::Pin {
					node_id: node_id.clone(),
					at: world + grab_offset,
				}];
				(
					S::Repositioning {
						node_id,
						grab_offset,
						pinned,
					},
					effects,
				)
			}
			(
				S::Repositioning { node_id, pinned, .. },
				GestureEvent::PointerUp { .. } | GestureEvent::Cancel,
			) => (S::Idle, vec![E::RestorePin { node_id, pinned }, E::EndDrag]),

			(S::Dragging { hit, .. }, GestureEvent::PointerMove { world, .. }) => {
				let effects = vec![
					E::Pin {
						node_id: hit.node_id.clone(),
						at: world,
					},
					E::Preview(Some(PreviewLine {
						from: hit.node_position,
						to: world,
					})),
				];
				(S::Dragging { hit, pointer: world }, effects)
			}
			(S::Dragging { hit, .. }, GestureEvent::PointerUp { drop_target, .. }) => {
				let mut effects = Self::send_home(&hit);
				match drop_target.filter(|target| *target != hit.node_id) {
					Some(target) => {
						effects.push(E::Prompt {
							source_node_id: hit.node_id.clone(),
							target_node_id: target.clone(),
						});
						(
							S::AwaitingConfirmation {
								source_node_id: hit.node_id,
								target_node_id: target,
								pin_id: hit.pin_id,
							},
							effects,
						)
					}
					None => {
						effects.push(E::Aborted);
						(S::Idle, effects)
					}
				}
			}
			(S::Dragging { hit, .. }, GestureEvent::Cancel) => {
				let mut effects = Self::send_home(&hit);
				effects.push(E::Aborted);
				(S::Idle, effects)
			}

			(
				S::AwaitingConfirmation {
					source_node_id,
					target_node_id,
					pin_id,
				},
				GestureEvent::Confirm { role },
			) => {
				let role = role.trim();
				if role.is_empty() {
					(
						S::AwaitingConfirmation {
							source_node_id,
							target_node_id,
							pin_id,
						},
						vec![],
					)
				} else {
					let intent = AssignmentIntent {
						source_node_id,
						target_node_id,
						role: role.to_string(),
						pin_id,
					};
					info!(
						"frame-graph: assigning {} -> {} as \"{}\"",
						intent.source_node_id, intent.target_node_id, intent.role
					);
					(
						S::Committing(intent.clone()),
						vec![E::ClosePrompt, E::Submit(intent)],
					)
				}
			}
			(S::AwaitingConfirmation { .. }, GestureEvent::Cancel) => {
				(S::Idle, vec![E::ClosePrompt])
			}

			(S::Committing(intent), GestureEvent::CommitSucceeded) => (
				S::Idle,
				vec![
					E::Notify(Notification::success(format!(
						"Assigned \"{}\"",
						intent.role
					))),
					E::Refresh,
				],
			),
			(S::Committing(intent), GestureEvent::CommitFailed { message }) => {
				warn!(
					"frame-graph: assignment {} -> {} failed: {message}",
					intent.source_node_id, intent.target_node_id
				);
				(S::Idle, vec![E::Notify(Notification::error(message))])
			}

			(state, _) => (state, vec![]),
		};
		self.state = next;
		effects
	}

	fn send_home(hit: &NodeHit) -> Vec<GestureEffect> {
		vec![
			GestureEffect::Preview(None),
			GestureEffect::Place {
				node_id: hit.node_id.clone(),
				at: hit.node_position,
			},
			GestureEffect::RestorePin {
				node_id: hit.node_id.clone(),
				pinned: hit.pinned,
			},
			GestureEffect::EndDrag,
		]
	}
}

/// Builds the mutation body for `intent` against the current graph.
///
/// The element is the pin the drag started on; failing that, the source
/// node's pin whose name matches the role, ignoring case.
pub fn resolve_assignment(
	model: &GraphModel,
	intent: &AssignmentIntent,
	environment_id: &str,
) -> Result<AssignFrameElement, GraphError> {
	let unknown = || GraphError::UnknownElement {
		role: intent.role.clone(),
	};
	let source = model.node(&intent.source_node_id).ok_or_else(unknown)?;
	let target = model.node(&intent.target_node_id).ok_or_else(unknown)?;
	let value = match &target.payload {
		NodePayload::Entity { id, .. } => id.clone(),
		other => other.entity_id().ok_or_else(unknown)?.to_string(),
	};

	let pin = intent
		.pin_id
		.as_deref()
		.and_then(|pin_id| source.pins.iter().find(|p| p.id == pin_id))
		.or_else(|| {
			source
				.pins
				.iter()
				.find(|p| p.name.eq_ignore_ascii_case(&intent.role))
		})
		.ok_or_else(unknown)?;

	Ok(AssignFrameElement {
		frame_id: pin.frame_id.clone(),
		element_id: pin.id.clone(),
		role: intent.role.clone(),
		environment_id: environment_id.to_string(),
		value,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::model::{Node, NodeKind, Pin};
	use pretty_assertions::assert_eq;

	fn machine() -> GestureMachine {
		GestureMachine::new(GestureConfig::default())
	}

	fn hit(node: &str) -> NodeHit {
		NodeHit {
			node_id: node.into(),
			pin_id: None,
			node_position: Point::new(100.0, 100.0),
			pinned: None,
		}
	}

	fn shift() -> Modifiers {
		Modifiers {
			shift: true,
			..Modifiers::default()
		}
	}

	fn press(m: &mut GestureMachine, node: &str) {
		m.dispatch(GestureEvent::PointerDown {
			hit: Some(hit(node)),
			world: Point::new(100.0, 100.0),
			screen: Point::new(100.0, 100.0),
		});
	}

	fn drag_to(m: &mut GestureMachine, x: f64, y: f64, modifiers: Modifiers) -> Vec<GestureEffect> {
		m.dispatch(GestureEvent::PointerMove {
			world: Point::new(x, y),
			screen: Point::new(x, y),
			modifiers,
		})
	}

	fn release(m: &mut GestureMachine, target: Option<&str>) -> Vec<GestureEffect> {
		m.dispatch(GestureEvent::PointerUp {
			world: Point::new(300.0, 300.0),
			drop_target: target.map(str::to_string),
		})
	}

	#[test]
	fn small_moves_stay_potential() {
		let mut m = machine();
		press(&mut m, "a");
		assert!(drag_to(&mut m, 102.0, 101.0, shift()).is_empty());
		assert!(matches!(m.state(), GestureState::PotentialDrag { .. }));
		assert!(release(&mut m, Some("b")).is_empty());
		assert!(m.is_idle());
	}

	#[test]
	fn drag_without_modifier_repositions_and_never_prompts() {
		let mut m = machine();
		press(&mut m, "a");
		let effects = drag_to(&mut m, 200.0, 150.0, Modifiers::default());
		assert_eq!(
			effects,
			vec![
				GestureEffect::BeginDrag,
				GestureEffect::Pin {
					node_id: "a".into(),
					at: Point::new(200.0, 150.0)
				}
			]
		);
		let effects = release(&mut m, Some("b"));
		assert_eq!(
			effects,
			vec![
				GestureEffect::RestorePin {
					node_id: "a".into(),
					pinned: None
				},
				GestureEffect::EndDrag
			]
		);
		assert!(m.is_idle());
	}

	#[test]
	fn assignment_drag_onto_a_node_prompts() {
		let mut m = machine();
		press(&mut m, "a");
		let effects = drag_to(&mut m, 250.0, 250.0, shift());
		assert!(effects.contains(&GestureEffect::Preview(Some(PreviewLine {
			from: Point::new(100.0, 100.0),
			to: Point::new(250.0, 250.0)
		}))));
		assert_eq!(m.dragged_node(), Some("a"));

		let effects = release(&mut m, Some("b"));
		assert_eq!(effects.first(), Some(&GestureEffect::Preview(None)));
		assert_eq!(
			effects.last(),
			Some(&GestureEffect::Prompt {
				source_node_id: "a".into(),
				target_node_id: "b".into()
			})
		);
		assert!(matches!(m.state(), GestureState::AwaitingConfirmation { .. }));
	}

	#[test]
	fn drop_on_background_aborts_silently_and_restores_pin() {
		let mut m = machine();
		m.dispatch(GestureEvent::PointerDown {
			hit: Some(NodeHit {
				pinned: Some(Point::new(5.0, 5.0)),
				..hit("a")
			}),
			world: Point::new(100.0, 100.0),
			screen: Point::new(100.0, 100.0),
		});
		drag_to(&mut m, 400.0, 400.0, shift());
		let effects = release(&mut m, None);
		assert!(effects.contains(&GestureEffect::RestorePin {
			node_id: "a".into(),
			pinned: Some(Point::new(5.0, 5.0))
		}));
		assert!(effects.contains(&GestureEffect::Aborted));
		assert!(!effects.iter().any(|e| matches!(
			e,
			GestureEffect::Notify(_) | GestureEffect::Prompt { .. }
		)));
		assert!(m.is_idle());
	}

	#[test]
	fn dropping_on_itself_aborts() {
		let mut m = machine();
		press(&mut m, "a");
		drag_to(&mut m, 400.0, 400.0, shift());
		assert!(release(&mut m, Some("a")).contains(&GestureEffect::Aborted));
		assert!(m.is_idle());
	}

	fn awaiting(m: &mut GestureMachine) {
		press(m, "a");
		drag_to(m, 300.0, 300.0, shift());
		release(m, Some("b"));
	}

	#[test]
	fn blank_role_keeps_the_prompt_open() {
		let mut m = machine();
		awaiting(&mut m);
		assert!(m.dispatch(GestureEvent::Confirm { role: "  ".into() }).is_empty());
		assert!(matches!(m.state(), GestureState::AwaitingConfirmation { .. }));
		assert_eq!(m.dispatch(GestureEvent::Cancel), vec![GestureEffect::ClosePrompt]);
		assert!(m.is_idle());
	}

	#[test]
	fn confirm_submits_then_refreshes_on_success() {
		let mut m = machine();
		awaiting(&mut m);
		let intent = AssignmentIntent {
			source_node_id: "a".into(),
			target_node_id: "b".into(),
			role: "addressee".into(),
			pin_id: None,
		};
		assert_eq!(
			m.dispatch(GestureEvent::Confirm {
				role: " addressee ".into()
			}),
			vec![GestureEffect::ClosePrompt, GestureEffect::Submit(intent.clone())]
		);
		assert_eq!(m.state(), &GestureState::Committing(intent));
		// pointer input is ignored while the mutation is in flight
		press(&mut m, "c");
		assert!(matches!(m.state(), GestureState::Committing(_)));

		let effects = m.dispatch(GestureEvent::CommitSucceeded);
		assert!(matches!(
			&effects[0],
			GestureEffect::Notify(n) if n.kind == NotificationKind::Success
		));
		assert_eq!(effects[1], GestureEffect::Refresh);
		assert!(m.is_idle());
	}

	#[test]
	fn failed_commit_notifies_without_refresh() {
		let mut m = machine();
		awaiting(&mut m);
		m.dispatch(GestureEvent::Confirm { role: "theme".into() });
		let effects = m.dispatch(GestureEvent::CommitFailed {
			message: "Assignment failed: locked".into(),
		});
		assert_eq!(
			effects,
			vec![GestureEffect::Notify(Notification::error(
				"Assignment failed: locked"
			))]
		);
		assert!(m.is_idle());
	}

	#[test]
	fn configured_modifier_is_honoured() {
		let mut m = GestureMachine::new(GestureConfig {
			modifier: ModifierKey::Alt,
			..GestureConfig::default()
		});
		press(&mut m, "a");
		drag_to(&mut m, 300.0, 300.0, shift());
		assert!(matches!(m.state(), GestureState::Repositioning { .. }));
	}

	fn node(id: &str, entity: &str, pins: Vec<Pin>) -> Node {
		Node {
			id: id.into(),
			label: id.into(),
			kind: NodeKind::Entity,
			payload: NodePayload::Entity {
				id: entity.into(),
				name: entity.into(),
			},
			position: None,
			pinned: None,
			pins,
		}
	}

	fn pin(id: &str, name: &str) -> Pin {
		Pin {
			id: id.into(),
			owner_node_id: "entity-2".into(),
			frame_id: "f1".into(),
			name: name.into(),
			definition: String::new(),
			angle_index: 0,
		}
	}

	#[test]
	fn resolves_element_by_pin_or_role_name() {
		let model = GraphModel {
			nodes: vec![
				node("entity-1", "1", vec![]),
				node("entity-2", "2", vec![pin("e1", "addressee"), pin("e2", "theme")]),
			],
			links: vec![],
		};
		let mut intent = AssignmentIntent {
			source_node_id: "entity-2".into(),
			target_node_id: "entity-1".into(),
			role: "Addressee".into(),
			pin_id: None,
		};
		let body = resolve_assignment(&model, &intent, "env-9").unwrap();
		assert_eq!(
			body,
			AssignFrameElement {
				frame_id: "f1".into(),
				element_id: "e1".into(),
				role: "Addressee".into(),
				environment_id: "env-9".into(),
				value: "1".into(),
			}
		);

		intent.pin_id = Some("e2".into());
		assert_eq!(resolve_assignment(&model, &intent, "env-9").unwrap().element_id, "e2");

		intent.pin_id = None;
		intent.role = "recipient".into();
		assert!(matches!(
			resolve_assignment(&model, &intent, "env-9"),
			Err(GraphError::UnknownElement { .. })
		));
	}
}
