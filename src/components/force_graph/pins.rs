//! Radial placement of element pins around their owning node.
//!
//! For `n` pins, pin `i` sits at angle `(i / n) * 2π - π/2` (the first pin at
//! twelve o'clock, going clockwise in screen coordinates), at distance
//! `radius + offset` from the node centre.

use std::f64::consts::{FRAC_PI_2, TAU};

use super::model::Point;

/// Default gap between a node's rim and its pins, in world units.
pub const DEFAULT_PIN_OFFSET: f64 = 15.0;

/// Angle of pin `index` out of `count`, in radians.
pub fn pin_angle(index: usize, count: usize) -> f64 {
	if count == 0 {
		return -FRAC_PI_2;
	}
	(index as f64 / count as f64) * TAU - FRAC_PI_2
}

/// Offsets of `count` pins relative to the node centre.
pub fn pin_offsets(count: usize, node_radius: f64, pin_offset: f64) -> Vec<Point> {
	let distance = node_radius + pin_offset;
	(0..count)
		.map(|i| {
			let angle = pin_angle(i, count);
			Point::new(angle.cos() * distance, angle.sin() * distance)
		})
		.collect()
}
