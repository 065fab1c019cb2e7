//! Wire records exchanged with the knowledge-graph service.
//!
//! These mirror the JSON the service returns. They are deliberately lenient:
//! ids may be strings or numbers, an entity's frames may be embedded objects
//! or bare ids, and an element's `value` is free-form JSON.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A record identifier, normalised to its string form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
	/// Wraps an id already in string form.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The id as text.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Blank ids are treated the same as missing ones.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for RecordId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl<'de> Deserialize<'de> for RecordId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Text(String),
			Int(i64),
			Float(f64),
		}

		Ok(match Raw::deserialize(deserializer)? {
			Raw::Text(s) => RecordId(s),
			Raw::Int(i) => RecordId(i.to_string()),
			Raw::Float(f) => RecordId(f.to_string()),
		})
	}
}

/// One frame element (a semantic role slot).
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ElementRecord {
	/// Element id.
	pub id: RecordId,
	/// Role name, e.g. "Agent".
	#[serde(default, deserialize_with = "text_or_empty")]
	pub name: String,
	/// Prose definition of the role.
	#[serde(default, deserialize_with = "text_or_empty")]
	pub definition: String,
	/// FrameNet core type ("core", "peripheral", ...).
	#[serde(default = "default_core_type", deserialize_with = "core_type_or_default")]
	pub core_type: String,
	/// Filler of the role. References another entity when it holds an id.
	#[serde(default)]
	pub value: Option<Value>,
}

fn default_core_type() -> String {
	"core".to_string()
}

/// Nullable text columns arrive as `null`; they read as empty.
fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn core_type_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_core_type))
}

impl ElementRecord {
	/// The entity id this element's value points at, if it points at one.
	///
	/// Accepts a bare string or integer id, or an object carrying it under
	/// `entity`, `entity_id`, `id` or `value`.
	pub fn entity_reference(&self) -> Option<String> {
		self.value.as_ref().and_then(|v| reference_from_value(v, 0))
	}
}

fn reference_from_value(value: &Value, depth: usize) -> Option<String> {
	match value {
		Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
		Value::Number(n) => n
			.as_i64()
			.map(|i| i.to_string())
			.or_else(|| n.as_u64().map(|u| u.to_string())),
		Value::Object(map) if depth == 0 => ["entity", "entity_id", "id", "value"]
			.iter()
			.find_map(|key| map.get(*key))
			.and_then(|inner| reference_from_value(inner, depth + 1)),
		_ => None,
	}
}

/// A lexical frame attached to an entity.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FrameRecord {
	/// Frame id.
	pub id: RecordId,
	/// Frame name, e.g. "Commerce_buy".
	#[serde(default, deserialize_with = "text_or_empty")]
	pub name: String,
	/// Prose definition of the frame.
	#[serde(default, deserialize_with = "text_or_empty")]
	pub definition: String,
	/// Role slots of the frame.
	#[serde(default)]
	pub elements: Vec<ElementRecord>,
}

/// A frame as listed on an entity: either embedded, or only its id.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FrameRef {
	/// The full frame record.
	Embedded(FrameRecord),
	/// Only the frame's id. The loader fetches the record.
	Id(RecordId),
}

/// An entity of the environment.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EntityRecord {
	/// Entity id. Entities without one are skipped.
	#[serde(default)]
	pub id: Option<RecordId>,
	/// Display name.
	#[serde(default, deserialize_with = "text_or_empty")]
	pub name: String,
	/// Frames attached to the entity.
	#[serde(default)]
	pub frames: Vec<FrameRef>,
}

/// Everything the canvas needs for one environment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentPayload {
	/// Entities in service order.
	pub entities: Vec<EntityRecord>,
}

impl EnvironmentPayload {
	/// Wraps a list of entities.
	pub fn new(entities: Vec<EntityRecord>) -> Self {
		Self { entities }
	}
}

/// Body of the `assign-frame-element` mutation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignFrameElement {
	/// Frame that owns the element.
	pub frame_id: String,
	/// Element being filled.
	pub element_id: String,
	/// Role name typed by the user.
	pub role: String,
	/// Environment the assignment belongs to.
	pub environment_id: String,
	/// Entity id the element should now reference.
	pub value: String,
}

/// Reply of the `assign-frame-element` mutation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AssignResponse {
	/// Whether the service accepted the assignment.
	#[serde(default)]
	pub ok: bool,
	/// Reason given for a rejection.
	#[serde(default)]
	pub detail: Option<String>,
}
