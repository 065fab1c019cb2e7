//! Leptos component wrapping the frame graph canvas.
//!
//! The component creates an HTML canvas, attaches native mouse, wheel, and
//! touch listeners, and drives [`ForceGraphState`] from a
//! `requestAnimationFrame` loop that only runs while something moves. The
//! assignment prompt, toasts, and the load error banner are plain Leptos
//! views layered over the canvas.
//!
//! On unmount every listener is detached, requests in flight are aborted,
//! and late completions are ignored.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, info, warn};
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{
	AddEventListenerOptions, CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement,
	KeyboardEvent, MouseEvent, Touch, TouchEvent, WheelEvent, Window,
};

use super::assignment::{Modifiers, Notification, NotificationKind};
use super::model::{GraphModel, NodePayload, Point};
use super::render;
use super::scheduler::TickScheduler;
use super::state::{ForceGraphState, HostAction};
use super::theme::Theme;
use super::types::AssignFrameElement;
use crate::api::{GraphService, RequestGeneration, load_environment};
use crate::config::CanvasConfig;

const TOAST_TTL: Duration = Duration::from_millis(4000);
const ROLE_LIST_ID: &str = "frame-graph-roles";
const CONTROLS_STYLE: &str = "position: absolute; top: 8px; right: 8px; display: flex; gap: 4px;";
const BANNER_STYLE: &str = "position: absolute; top: 8px; left: 50%; transform: translateX(-50%);";
const PROMPT_STYLE: &str =
	"position: absolute; bottom: 16px; left: 50%; transform: translateX(-50%);";

/// Schedules frames with `requestAnimationFrame`, at most one outstanding.
struct RafScheduler {
	callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
	handle: Rc<Cell<Option<i32>>>,
}

impl TickScheduler for RafScheduler {
	fn request_frame(&mut self) {
		if self.handle.get().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(ref cb) = *self.callback.borrow() {
			match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				Ok(handle) => self.handle.set(Some(handle)),
				Err(e) => warn!("frame-graph: requestAnimationFrame failed: {e:?}"),
			}
		}
	}

	fn cancel(&mut self) {
		if let (Some(handle), Some(window)) = (self.handle.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(handle);
		}
	}
}

/// A native listener that is removed when dropped.
struct ListenerGuard {
	target: EventTarget,
	event: &'static str,
	callback: Closure<dyn FnMut(Event)>,
	attached: bool,
}

impl ListenerGuard {
	fn attach(
		target: &EventTarget,
		event: &'static str,
		passive: bool,
		handler: impl FnMut(Event) + 'static,
	) -> Option<Self> {
		let callback = Closure::<dyn FnMut(Event)>::new(handler);
		let options = AddEventListenerOptions::new();
		options.set_passive(passive);
		match target.add_event_listener_with_callback_and_add_event_listener_options(
			event,
			callback.as_ref().unchecked_ref(),
			&options,
		) {
			Ok(()) => Some(Self {
				target: target.clone(),
				event,
				callback,
				attached: true,
			}),
			Err(e) => {
				warn!("frame-graph: could not listen for {event}: {e:?}");
				None
			}
		}
	}

	fn detach(&mut self) {
		if self.attached {
			let callback = self.callback.as_ref().unchecked_ref();
			let _ = self.target.remove_event_listener_with_callback(self.event, callback);
			self.attached = false;
		}
	}
}

impl Drop for ListenerGuard {
	fn drop(&mut self) {
		self.detach();
	}
}

/// Role prompt contents.
#[derive(Clone, Debug, PartialEq)]
struct RolePrompt {
	source_label: String,
	target_label: String,
	roles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
struct Toast {
	id: u64,
	notification: Notification,
}

/// Reactive surface of the canvas.
#[derive(Clone, Copy)]
struct CanvasUi {
	prompt: RwSignal<Option<RolePrompt>>,
	role: RwSignal<String>,
	toasts: RwSignal<Vec<Toast>>,
	load_error: RwSignal<Option<String>>,
	loading: RwSignal<bool>,
}

impl CanvasUi {
	fn new() -> Self {
		Self {
			prompt: RwSignal::new(None),
			role: RwSignal::new(String::new()),
			toasts: RwSignal::new(Vec::new()),
			load_error: RwSignal::new(None),
			loading: RwSignal::new(false),
		}
	}
}

/// Glue between browser callbacks and [`ForceGraphState`].
#[derive(Clone)]
struct Host {
	state: Rc<RefCell<Option<ForceGraphState>>>,
	service: Rc<dyn GraphService>,
	generation: RequestGeneration,
	ui: CanvasUi,
	on_entity_selected: Option<Callback<Option<NodePayload>>>,
	listeners: Rc<RefCell<Vec<ListenerGuard>>>,
	frame_callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
	frame_handle: Rc<Cell<Option<i32>>>,
	next_toast: Rc<Cell<u64>>,
}

impl Host {
	fn new(
		service: Rc<dyn GraphService>,
		ui: CanvasUi,
		on_entity_selected: Option<Callback<Option<NodePayload>>>,
	) -> Self {
		Self {
			state: Rc::new(RefCell::new(None)),
			service,
			generation: RequestGeneration::new(),
			ui,
			on_entity_selected,
			listeners: Rc::new(RefCell::new(Vec::new())),
			frame_callback: Rc::new(RefCell::new(None)),
			frame_handle: Rc::new(Cell::new(None)),
			next_toast: Rc::new(Cell::new(0)),
		}
	}

	fn is_mounted(&self) -> bool {
		self.state.try_borrow().map(|s| s.is_some()).unwrap_or(true)
	}

	fn scheduler(&self) -> RafScheduler {
		RafScheduler {
			callback: self.frame_callback.clone(),
			handle: self.frame_handle.clone(),
		}
	}

	fn with_state<R>(&self, f: impl FnOnce(&mut ForceGraphState) -> R) -> Option<R> {
		let mut guard = self.state.try_borrow_mut().ok()?;
		guard.as_mut().map(f)
	}

	/// Runs `f` and carries out the actions it raised.
	fn dispatch(&self, f: impl FnOnce(&mut ForceGraphState) -> Vec<HostAction>) {
		let actions = self.with_state(f).unwrap_or_default();
		self.apply(actions);
	}

	fn control(&self, f: fn(&mut ForceGraphState)) {
		self.with_state(f);
	}

	fn start_frames(&self, ctx: CanvasRenderingContext2d, theme: Theme) {
		let host = self.clone();
		*self.frame_callback.borrow_mut() = Some(Closure::new(move |now: f64| {
			host.frame_handle.set(None);
			host.dispatch(|state| {
				let actions = state.frame(now);
				render::render(state, &ctx, &theme);
				actions
			});
		}));
	}

	fn apply(&self, actions: Vec<HostAction>) {
		for action in actions {
			match action {
				HostAction::EntitySelected(payload) => {
					if let Some(cb) = &self.on_entity_selected {
						cb.run(payload);
					}
				}
				HostAction::Prompt {
					source_label,
					target_label,
					roles,
					preset,
				} => {
					self.ui.role.set(preset.unwrap_or_default());
					self.ui.prompt.set(Some(RolePrompt {
						source_label,
						target_label,
						roles,
					}));
				}
				HostAction::ClosePrompt => self.ui.prompt.set(None),
				HostAction::Submit(body) => self.submit(body),
				HostAction::Notify(notification) => self.notify(notification),
				HostAction::Refresh => self.load(),
			}
		}
	}

	/// Fetches the current environment and queues it as the next snapshot.
	fn load(&self) {
		let Some(environment_id) = self.with_state(|s| s.environment_id().to_string()) else {
			return;
		};
		if environment_id.is_empty() {
			warn!("frame-graph: no environment to load");
			return;
		}
		self.service.cancel_pending();
		let generation = self.generation.next();
		self.ui.loading.set(true);

		let host = self.clone();
		spawn_local(async move {
			let result = load_environment(host.service.as_ref(), &environment_id).await;
			if !host.generation.is_current(generation) {
				debug!("frame-graph: dropping stale load of {environment_id}");
				return;
			}
			host.ui.loading.set(false);
			match result {
				Ok(payload) => {
					host.ui.load_error.set(None);
					host.with_state(|s| s.load_payload(&payload));
				}
				Err(err) => {
					warn!("frame-graph: loading {environment_id} failed: {err}");
					host.ui.load_error.set(Some(err.user_message()));
					host.dispatch(ForceGraphState::load_failed);
				}
			}
		});
	}

	fn switch_environment(&self, environment_id: &str) {
		info!("frame-graph: switching to environment {environment_id}");
		self.with_state(|s| s.set_environment(environment_id));
		self.load();
	}

	fn submit(&self, body: AssignFrameElement) {
		let host = self.clone();
		spawn_local(async move {
			let result = host.service.assign_frame_element(&body).await;
			match &result {
				Ok(()) => info!(
					"frame-graph: assigned {} of {} to {}",
					body.element_id, body.frame_id, body.value
				),
				Err(err) => warn!("frame-graph: assignment failed: {err}"),
			}
			host.dispatch(|s| {
				if s.is_torn_down() {
					Vec::new()
				} else {
					s.assignment_finished(result)
				}
			});
		});
	}

	fn notify(&self, notification: Notification) {
		let id = self.next_toast.get();
		self.next_toast.set(id + 1);
		let toasts = self.ui.toasts;
		toasts.update(|t| t.push(Toast { id, notification }));
		set_timeout(
			move || {
				toasts.try_update(|t| t.retain(|toast| toast.id != id));
			},
			TOAST_TTL,
		);
	}

	fn confirm(&self) {
		let role = self.ui.role.get_untracked();
		self.dispatch(|s| s.confirm_assignment(&role));
	}

	fn cancel(&self) {
		self.dispatch(ForceGraphState::cancel_assignment);
	}

	fn teardown(&self, on_teardown: Option<Callback<GraphModel>>) {
		self.generation.invalidate();
		self.service.cancel_pending();
		let snapshot = self.with_state(|s| {
			let snapshot = s.snapshot();
			s.teardown();
			snapshot
		});
		if let (Some(cb), Some(snapshot)) = (on_teardown, snapshot) {
			cb.run(snapshot);
		}

		let mut listeners = std::mem::take(&mut *self.listeners.borrow_mut());
		for listener in &mut listeners {
			listener.detach();
		}
		let frame = self.frame_callback.borrow_mut().take();
		let state = self.state.try_borrow_mut().ok().and_then(|mut s| s.take());
		// closures may still be on the stack
		set_timeout(move || drop((listeners, frame, state)), Duration::ZERO);
	}
}

fn canvas_size(
	canvas: &HtmlCanvasElement,
	window: &Window,
	fullscreen: bool,
	width: Option<f64>,
	height: Option<f64>,
) -> (f64, f64) {
	if fullscreen {
		let dim = |v: Result<JsValue, JsValue>, fallback: f64| {
			v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
		};
		return (dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0));
	}
	let parent = canvas.parent_element();
	let parent_width = parent.as_ref().map(|p| p.client_width() as f64);
	let parent_height = parent.as_ref().map(|p| p.client_height() as f64);
	(
		width.or(parent_width).unwrap_or(800.0),
		height.or(parent_height).unwrap_or(600.0),
	)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

fn local_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(client_x as f64 - rect.left(), client_y as f64 - rect.top())
}

fn touch_point(canvas: &HtmlCanvasElement, touch: &Touch) -> Point {
	local_point(canvas, touch.client_x(), touch.client_y())
}

fn modifiers(ev: &MouseEvent) -> Modifiers {
	Modifiers {
		shift: ev.shift_key(),
		alt: ev.alt_key(),
		ctrl: ev.ctrl_key(),
		meta: ev.meta_key(),
	}
}

fn mouse_listener(
	host: &Host,
	canvas: &HtmlCanvasElement,
	event: &'static str,
	mut handler: impl FnMut(&Host, &MouseEvent, Point) + 'static,
) -> Option<ListenerGuard> {
	let (host, c) = (host.clone(), canvas.clone());
	ListenerGuard::attach(canvas, event, true, move |ev: Event| {
		if let Some(ev) = ev.dyn_ref::<MouseEvent>() {
			let at = local_point(&c, ev.client_x(), ev.client_y());
			handler(&host, ev, at);
		}
	})
}

fn touch_listener(
	host: &Host,
	canvas: &HtmlCanvasElement,
	event: &'static str,
	mut handler: impl FnMut(&Host, &HtmlCanvasElement, &TouchEvent) + 'static,
) -> Option<ListenerGuard> {
	let (host, c) = (host.clone(), canvas.clone());
	ListenerGuard::attach(canvas, event, false, move |ev: Event| {
		if let Some(ev) = ev.dyn_ref::<TouchEvent>() {
			ev.prevent_default();
			handler(&host, &c, ev);
		}
	})
}

fn canvas_listeners(host: &Host, canvas: &HtmlCanvasElement) -> Vec<ListenerGuard> {
	let mut listeners = vec![
		mouse_listener(host, canvas, "mousedown", |host, ev, at| {
			let now = ev.time_stamp();
			host.dispatch(|s| s.pointer_down(at, now));
		}),
		mouse_listener(host, canvas, "mousemove", |host, ev, at| {
			let held = modifiers(ev);
			host.dispatch(|s| s.pointer_move(at, held));
		}),
		mouse_listener(host, canvas, "mouseup", |host, ev, at| {
			let now = ev.time_stamp();
			host.dispatch(|s| s.pointer_up(at, now));
		}),
		mouse_listener(host, canvas, "mouseleave", |host, _, _| {
			host.dispatch(ForceGraphState::pointer_leave);
		}),
		touch_listener(host, canvas, "touchstart", |host, canvas, ev| {
			let touches = ev.touches();
			match (touches.get(0), touches.get(1)) {
				(Some(a), Some(b)) => {
					let (a, b) = (touch_point(canvas, &a), touch_point(canvas, &b));
					host.dispatch(|s| s.pinch_start(a, b));
				}
				(Some(a), None) => {
					let (at, now) = (touch_point(canvas, &a), ev.time_stamp());
					host.dispatch(|s| s.pointer_down(at, now));
				}
				_ => {}
			}
		}),
		touch_listener(host, canvas, "touchmove", |host, canvas, ev| {
			let touches = ev.touches();
			match (touches.get(0), touches.get(1)) {
				(Some(a), Some(b)) => {
					let (a, b) = (touch_point(canvas, &a), touch_point(canvas, &b));
					host.with_state(|s| s.pinch_move(a, b));
				}
				(Some(a), None) => {
					let at = touch_point(canvas, &a);
					host.dispatch(|s| {
						if s.viewport().is_pinching() {
							Vec::new()
						} else {
							s.pointer_move(at, Modifiers::default())
						}
					});
				}
				_ => {}
			}
		}),
		touch_listener(host, canvas, "touchend", |host, canvas, ev| {
			let remaining = ev.touches().length();
			let lifted = ev.changed_touches().get(0).map(|t| touch_point(canvas, &t));
			let now = ev.time_stamp();
			host.dispatch(|s| {
				if s.viewport().is_pinching() {
					if remaining < 2 {
						s.pinch_end();
					}
					Vec::new()
				} else {
					lifted.map(|at| s.pointer_up(at, now)).unwrap_or_default()
				}
			});
		}),
		touch_listener(host, canvas, "touchcancel", |host, _, _| {
			host.dispatch(|s| {
				s.pinch_end();
				s.pointer_leave()
			});
		}),
	];

	let (wheel_host, c) = (host.clone(), canvas.clone());
	listeners.push(ListenerGuard::attach(canvas, "wheel", false, move |ev: Event| {
		if let Some(ev) = ev.dyn_ref::<WheelEvent>() {
			ev.prevent_default();
			let at = local_point(&c, ev.client_x(), ev.client_y());
			let delta = ev.delta_y();
			wheel_host.with_state(|s| s.wheel(delta, at));
		}
	}));

	listeners.into_iter().flatten().collect()
}

fn window_listeners(
	host: &Host,
	window: &Window,
	canvas: &HtmlCanvasElement,
	fullscreen: bool,
) -> Vec<ListenerGuard> {
	let mut listeners = Vec::new();
	if fullscreen {
		let (host, c) = (host.clone(), canvas.clone());
		listeners.push(ListenerGuard::attach(window, "resize", true, move |_| {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (w, h) = canvas_size(&c, &win, true, None, None);
			c.set_width(w as u32);
			c.set_height(h as u32);
			host.with_state(|s| s.resize(w, h));
		}));
	}
	let key_host = host.clone();
	listeners.push(ListenerGuard::attach(window, "keydown", true, move |ev: Event| {
		if ev.dyn_ref::<KeyboardEvent>().is_some_and(|k| k.key() == "Escape") {
			key_host.cancel();
		}
	}));
	listeners.into_iter().flatten().collect()
}

/// Renders the frame graph of one environment on a canvas element.
///
/// The component loads `environment_id` through `service` and reloads when
/// the signal changes. Pass `snapshot` to start from a graph kept by a
/// previous mount; `on_teardown` receives the final graph with positions on
/// unmount. The canvas sizes itself to its parent container by default; set
/// `fullscreen = true` to fill the viewport and follow window resizes.
/// Explicit `width`/`height` override automatic sizing.
#[component]
pub fn ForceGraphCanvas(
	/// Layout, viewport, gesture, and sizing settings.
	config: CanvasConfig,
	/// Backend the graph is loaded from and assignments are sent to.
	service: Rc<dyn GraphService>,
	/// Environment to show.
	#[prop(into)]
	environment_id: Signal<String>,
	/// Called with the selected entity, or `None` when the selection clears.
	#[prop(optional)]
	on_entity_selected: Option<Callback<Option<NodePayload>>>,
	/// Graph kept by a previous mount.
	#[prop(optional)]
	snapshot: Option<GraphModel>,
	/// Receives the final graph on unmount.
	#[prop(optional)]
	on_teardown: Option<Callback<GraphModel>>,
	/// Colors; slate when absent.
	#[prop(optional)]
	theme: Option<Theme>,
	/// Fill the window and follow its resizes.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width in pixels.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height in pixels.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let ui = CanvasUi::new();
	let host = Host::new(service, ui, on_entity_selected);
	let theme = theme.unwrap_or_default();

	let host_init = host.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if host_init.is_mounted() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			warn!("frame-graph: no window, canvas stays blank");
			return;
		};

		let (w, h) = canvas_size(&canvas, &window, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		let Some(ctx) = context_2d(&canvas) else {
			warn!("frame-graph: canvas has no 2d context");
			return;
		};

		let mut state = ForceGraphState::new(&config, w, h, Box::new(host_init.scheduler()));
		state.set_environment(&environment_id.get_untracked());
		*host_init.state.borrow_mut() = Some(state);
		host_init.start_frames(ctx, theme.clone());

		let mut listeners = canvas_listeners(&host_init, &canvas);
		listeners.extend(window_listeners(&host_init, &window, &canvas, fullscreen));
		*host_init.listeners.borrow_mut() = listeners;

		match snapshot.clone() {
			Some(model) => host_init.with_state(|s| s.queue_snapshot(model)),
			None => host_init.with_state(|s| s.resize(w, h)),
		};
		host_init.load();
		debug!("frame-graph: canvas mounted at {w}x{h}");
	});

	let host_store = StoredValue::new_local(host.clone());

	Effect::new(move |previous: Option<String>| {
		let environment = environment_id.get();
		if previous.is_some_and(|p| p != environment) {
			host_store.with_value(|h| h.switch_environment(&environment));
		}
		environment
	});

	let cleanup_host = SendWrapper::new(host.clone());
	on_cleanup(move || cleanup_host.teardown(on_teardown));

	let container_style = if fullscreen {
		"position: fixed; inset: 0; overflow: hidden;"
	} else {
		"position: relative; width: 100%; height: 100%; overflow: hidden;"
	};

	let (zoom_in, zoom_out, reset, fit) = (host.clone(), host.clone(), host.clone(), host);
	let on_zoom_in = move |_: MouseEvent| zoom_in.control(ForceGraphState::zoom_in);
	let on_zoom_out = move |_: MouseEvent| zoom_out.control(ForceGraphState::zoom_out);
	let on_reset = move |_: MouseEvent| reset.control(ForceGraphState::reset_zoom);
	let on_fit = move |_: MouseEvent| fit.control(ForceGraphState::fit);

	view! {
		<div class="frame-graph" style=container_style>
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				style="display: block; cursor: grab; touch-action: none;"
			/>
			<div class="frame-graph-controls" style=CONTROLS_STYLE>
				<button title="Zoom in" on:click=on_zoom_in>"+"</button>
				<button title="Zoom out" on:click=on_zoom_out>"−"</button>
				<button title="Reset zoom" on:click=on_reset>"Reset"</button>
				<button title="Fit graph" on:click=on_fit>"Fit"</button>
			</div>
			<Show when=move || ui.loading.get()>
				<div class="frame-graph-loading" style="position: absolute; top: 8px; left: 8px;">
					"Loading…"
				</div>
			</Show>
			{move || {
				ui.load_error
					.get()
					.map(|message| {
						view! {
							<div class="frame-graph-error" role="alert" style=BANNER_STYLE>
								<span>{message}</span>
								<button on:click=move |_| host_store.with_value(Host::load)>
									"Retry"
								</button>
							</div>
						}
					})
			}}
			{move || {
				ui.prompt
					.get()
					.map(|prompt| {
						let options = prompt
							.roles
							.into_iter()
							.map(|role| view! { <option value=role></option> })
							.collect_view();
						view! {
							<form
								class="frame-graph-prompt"
								style=PROMPT_STYLE
								on:submit=move |ev| {
									ev.prevent_default();
									host_store.with_value(Host::confirm);
								}
							>
								<label>
									"Role of " <strong>{prompt.source_label}</strong> " for "
									<strong>{prompt.target_label}</strong>
									<input
										type="text"
										list=ROLE_LIST_ID
										autofocus=true
										prop:value=move || ui.role.get()
										on:input=move |ev| ui.role.set(event_target_value(&ev))
									/>
								</label>
								<datalist id=ROLE_LIST_ID>{options}</datalist>
								<button type="submit">"Assign"</button>
								<button
									type="button"
									on:click=move |_| host_store.with_value(Host::cancel)
								>
									"Cancel"
								</button>
							</form>
						}
					})
			}}
			<div class="frame-graph-toasts" style="position: absolute; bottom: 8px; right: 8px;">
				<For
					each=move || ui.toasts.get()
					key=|toast| toast.id
					children=move |toast| {
						let class = match toast.notification.kind {
							NotificationKind::Success => "frame-graph-toast success",
							NotificationKind::Error => "frame-graph-toast error",
						};
						view! { <div class=class role="status">{toast.notification.message}</div> }
					}
				/>
			</div>
		</div>
	}
}
