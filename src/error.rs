//! Error types surfaced by the data and mutation boundaries.
//!
//! Only data loading and assignment submission can fail in a way the user
//! sees. Layout and gesture hazards are recovered where they happen and never
//! reach this type.

use thiserror::Error;

/// Failures talking to the knowledge-graph service.
#[derive(Debug, Error)]
pub enum GraphError {
	/// The request never produced a response (network failure, abort, JS exception).
	#[error("request to {url} failed: {message}")]
	Transport { url: String, message: String },

	/// The service answered with a non-success status.
	#[error("{url} answered HTTP {status}")]
	Status { url: String, status: u16 },

	/// The response body did not match the expected record shape.
	#[error("could not decode response: {0}")]
	Decode(#[from] serde_json::Error),

	/// The mutation endpoint refused the role assignment.
	#[error("assignment rejected: {detail}")]
	AssignmentRejected { detail: String },

	/// The typed role does not name any element of the dragged frame.
	#[error("no frame element named \"{role}\" on the dragged entity")]
	UnknownElement { role: String },
}

impl GraphError {
	/// True for failures retrieving entity or frame data.
	pub fn is_fetch_error(&self) -> bool {
		matches!(
			self,
			GraphError::Transport { .. } | GraphError::Status { .. } | GraphError::Decode(_)
		)
	}

	/// True for failures of a submitted role assignment.
	pub fn is_assignment_error(&self) -> bool {
		matches!(
			self,
			GraphError::AssignmentRejected { .. } | GraphError::UnknownElement { .. }
		)
	}

	/// Short message for notifications and the retry banner.
	pub fn user_message(&self) -> String {
		match self {
			GraphError::Transport { .. } => "Could not reach the graph service.".to_string(),
			GraphError::Status { status, .. } => {
				format!("The graph service answered with HTTP {status}.")
			}
			GraphError::Decode(_) => "The graph service sent data we could not read.".to_string(),
			GraphError::AssignmentRejected { detail } => format!("Assignment failed: {detail}"),
			GraphError::UnknownElement { role } => {
				format!("The dragged frame has no element named \"{role}\".")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fetch_and_assignment_errors_are_disjoint() {
		let fetch = GraphError::Status {
			url: "/api/entities".into(),
			status: 502,
		};
		let rejected = GraphError::AssignmentRejected {
			detail: "frame locked".into(),
		};
		assert!(fetch.is_fetch_error());
		assert!(!fetch.is_assignment_error());
		assert!(rejected.is_assignment_error());
		assert!(!rejected.is_fetch_error());
	}

	#[test]
	fn decode_errors_convert_from_serde() {
		let err: GraphError = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
		assert!(err.is_fetch_error());
		assert!(err.user_message().contains("could not read"));
	}
}
