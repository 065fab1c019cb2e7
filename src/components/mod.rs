//! Leptos components.

pub mod force_graph;
