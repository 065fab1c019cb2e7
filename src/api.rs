//! Boundary to the knowledge-graph service.
//!
//! The canvas only sees [`GraphService`]: three async calls returning wire
//! records. [`HttpGraphService`] implements it over the browser `fetch` API;
//! tests use an in-memory implementation.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestInit, RequestMode, Response};

use crate::components::force_graph::{
	AssignFrameElement, AssignResponse, EntityRecord, EnvironmentPayload, FrameRecord, FrameRef,
};
use crate::error::GraphError;

/// Queries and mutations the canvas needs from its host.
#[async_trait(?Send)]
pub trait GraphService {
	/// All entities of an environment. Frames may be embedded or bare ids.
	async fn entities_for_environment(
		&self,
		environment_id: &str,
	) -> Result<Vec<EntityRecord>, GraphError>;

	/// One frame with its elements.
	async fn frame(&self, frame_id: &str) -> Result<FrameRecord, GraphError>;

	/// Points a frame element at an entity under a role name.
	async fn assign_frame_element(&self, body: &AssignFrameElement) -> Result<(), GraphError>;

	/// Aborts requests in flight, if the transport can.
	fn cancel_pending(&self) {}
}

/// Fetches an environment and expands every frame listed only by id.
///
/// Each distinct frame id is fetched once even when several entities share
/// it. Any failure fails the whole load.
pub async fn load_environment(
	service: &dyn GraphService,
	environment_id: &str,
) -> Result<EnvironmentPayload, GraphError> {
	let mut entities = service.entities_for_environment(environment_id).await?;

	let mut resolved: HashMap<String, FrameRecord> = HashMap::new();
	for entity in &entities {
		for frame in &entity.frames {
			if let FrameRef::Id(id) = frame {
				if !resolved.contains_key(id.as_str()) {
					let record = service.frame(id.as_str()).await?;
					resolved.insert(id.to_string(), record);
				}
			}
		}
	}
	if !resolved.is_empty() {
		debug!("frame-graph: expanded {} frames by id", resolved.len());
	}

	for entity in &mut entities {
		for frame in &mut entity.frames {
			if let FrameRef::Id(id) = frame {
				if let Some(record) = resolved.get(id.as_str()) {
					*frame = FrameRef::Embedded(record.clone());
				}
			}
		}
	}
	Ok(EnvironmentPayload::new(entities))
}

/// Monotonic counter used to drop completions of superseded loads.
#[derive(Clone, Debug, Default)]
pub struct RequestGeneration(Rc<Cell<u64>>);

impl RequestGeneration {
	/// Starts at generation zero.
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new generation, making every earlier one stale.
	pub fn next(&self) -> u64 {
		let next = self.0.get() + 1;
		self.0.set(next);
		next
	}

	/// Whether `generation` is still the latest one issued.
	pub fn is_current(&self, generation: u64) -> bool {
		self.0.get() == generation
	}

	/// Makes every issued generation stale.
	pub fn invalidate(&self) {
		self.next();
	}
}

/// [`GraphService`] over `fetch`, rooted at `base_url`.
///
/// Endpoints:
/// - `GET {base}/environments/{id}/entities`
/// - `GET {base}/frames/{id}`
/// - `POST {base}/assign-frame-element`
pub struct HttpGraphService {
	base_url: String,
	abort: RefCell<Option<AbortController>>,
}

impl HttpGraphService {
	/// Service rooted at `base_url`; a trailing slash is ignored.
	pub fn new(base_url: &str) -> Self {
		Self {
			base_url: base_url.trim_end_matches('/').to_string(),
			abort: RefCell::new(None),
		}
	}

	fn url(&self, segments: &[&str]) -> String {
		let mut url = self.base_url.clone();
		for segment in segments {
			url.push('/');
			url.push_str(&String::from(js_sys::encode_uri_component(segment)));
		}
		url
	}

	/// Signal shared by all requests until the next [`GraphService::cancel_pending`].
	fn signal(&self) -> Option<web_sys::AbortSignal> {
		let mut slot = self.abort.borrow_mut();
		if slot.is_none() {
			*slot = AbortController::new().ok();
		}
		slot.as_ref().map(AbortController::signal)
	}

	/// Sends a request and returns status plus body text.
	async fn send(
		&self,
		method: &str,
		url: &str,
		body: Option<String>,
	) -> Result<(u16, String), GraphError> {
		let transport = |e: JsValue| GraphError::Transport {
			url: url.to_string(),
			message: format!("{e:?}"),
		};

		let opts = RequestInit::new();
		opts.set_method(method);
		opts.set_mode(RequestMode::SameOrigin);
		if let Some(signal) = self.signal() {
			opts.set_signal(Some(&signal));
		}
		if let Some(body) = &body {
			opts.set_body(&JsValue::from_str(body));
		}

		let request = Request::new_with_str_and_init(url, &opts).map_err(transport)?;
		request.headers().set("Accept", "application/json").map_err(transport)?;
		if body.is_some() {
			request
				.headers()
				.set("Content-Type", "application/json")
				.map_err(transport)?;
		}

		let window = web_sys::window().ok_or_else(|| GraphError::Transport {
			url: url.to_string(),
			message: "no window".to_string(),
		})?;
		let response: Response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(transport)?
			.dyn_into()
			.map_err(transport)?;
		let text = JsFuture::from(response.text().map_err(transport)?)
			.await
			.map_err(transport)?
			.as_string()
			.unwrap_or_default();
		Ok((response.status(), text))
	}

	async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, GraphError> {
		let (status, text) = self.send("GET", url, None).await?;
		if !(200..300).contains(&status) {
			return Err(GraphError::Status {
				url: url.to_string(),
				status,
			});
		}
		Ok(serde_json::from_str(&text)?)
	}
}

#[async_trait(?Send)]
impl GraphService for HttpGraphService {
	async fn entities_for_environment(
		&self,
		environment_id: &str,
	) -> Result<Vec<EntityRecord>, GraphError> {
		let url = self.url(&["environments", environment_id, "entities"]);
		self.get_json(&url).await
	}

	async fn frame(&self, frame_id: &str) -> Result<FrameRecord, GraphError> {
		let url = self.url(&["frames", frame_id]);
		self.get_json(&url).await
	}

	async fn assign_frame_element(&self, body: &AssignFrameElement) -> Result<(), GraphError> {
		let url = self.url(&["assign-frame-element"]);
		let (status, text) = self
			.send("POST", &url, Some(serde_json::to_string(body)?))
			.await?;
		assignment_outcome(status, &text)
	}

	fn cancel_pending(&self) {
		if let Some(controller) = self.abort.borrow_mut().take() {
			controller.abort();
		}
	}
}

/// Interprets the mutation reply. Anything but `{ok: true}` with a 2xx status
/// is a rejection; the service's `detail` is kept when present.
fn assignment_outcome(status: u16, text: &str) -> Result<(), GraphError> {
	let reply: Option<AssignResponse> = serde_json::from_str(text).ok();
	let success = (200..300).contains(&status);
	match reply {
		Some(AssignResponse { ok: true, .. }) if success => Ok(()),
		Some(AssignResponse {
			detail: Some(detail),
			..
		}) => Err(GraphError::AssignmentRejected { detail }),
		_ => {
			warn!("frame-graph: assignment answered HTTP {status} without detail");
			Err(GraphError::AssignmentRejected {
				detail: format!("HTTP {status}"),
			})
		}
	}
}
