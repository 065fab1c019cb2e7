//! Pan/zoom transform and the gestures that drive it.
//!
//! The transform maps world to screen as `screen = (world + translate) * scale`,
//! so translation is kept in world units and a background drag of `d` pixels
//! moves it by `d / scale`.
//!
//! Zoom (wheel, pinch, buttons) scales around an anchor so the world point
//! under the anchor stays put. Reset and fit animate over a fixed duration;
//! [`ViewportController::advance`] is called once per frame to progress them.

use serde::Deserialize;

use super::model::Point;

/// Zoom limits and gesture tuning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
	/// Smallest allowed scale.
	pub min_zoom: f64,
	/// Largest allowed scale.
	pub max_zoom: f64,
	/// Factor applied by the zoom-in/zoom-out buttons.
	pub zoom_step: f64,
	/// Factor applied per wheel notch.
	pub wheel_factor: f64,
	/// Duration of the reset/fit animation.
	pub reset_duration_ms: f64,
	/// Screen-space margin kept around fitted content.
	pub fit_padding: f64,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			min_zoom: 0.1,
			max_zoom: 4.0,
			zoom_step: 1.25,
			wheel_factor: 1.1,
			reset_duration_ms: 750.0,
			fit_padding: 40.0,
		}
	}
}

/// Translate + scale applied to the whole canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
	/// Horizontal translation in world units.
	pub translate_x: f64,
	/// Vertical translation in world units.
	pub translate_y: f64,
	/// Zoom factor.
	pub scale: f64,
}

impl Default for ViewportTransform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl ViewportTransform {
	/// No translation, scale 1.
	pub const IDENTITY: ViewportTransform = ViewportTransform {
		translate_x: 0.0,
		translate_y: 0.0,
		scale: 1.0,
	};

	/// Maps a world point to screen pixels.
	pub fn to_screen(&self, world: Point) -> Point {
		Point::new(
			(world.x + self.translate_x) * self.scale,
			(world.y + self.translate_y) * self.scale,
		)
	}

	/// Maps a screen pixel to a world point.
	pub fn to_world(&self, screen: Point) -> Point {
		Point::new(
			screen.x / self.scale - self.translate_x,
			screen.y / self.scale - self.translate_y,
		)
	}

	fn lerp(&self, other: &ViewportTransform, t: f64) -> ViewportTransform {
		ViewportTransform {
			translate_x: self.translate_x + (other.translate_x - self.translate_x) * t,
			translate_y: self.translate_y + (other.translate_y - self.translate_y) * t,
			scale: self.scale + (other.scale - self.scale) * t,
		}
	}
}

#[derive(Clone, Debug)]
struct TransformAnimation {
	from: ViewportTransform,
	to: ViewportTransform,
	/// Set on the first frame after the animation was requested.
	started_at: Option<f64>,
	duration_ms: f64,
}

#[derive(Clone, Debug)]
struct PinchState {
	start_distance: f64,
	start_scale: f64,
}

/// Owns the viewport transform and interprets zoom/pan gestures.
#[derive(Clone, Debug)]
pub struct ViewportController {
	config: ViewportConfig,
	transform: ViewportTransform,
	width: f64,
	height: f64,
	pan_last: Option<Point>,
	pinch: Option<PinchState>,
	animation: Option<TransformAnimation>,
}

impl ViewportController {
	/// A controller at the identity transform for a `width` by `height` canvas.
	pub fn new(config: ViewportConfig, width: f64, height: f64) -> Self {
		Self {
			config,
			transform: ViewportTransform::IDENTITY,
			width,
			height,
			pan_last: None,
			pinch: None,
			animation: None,
		}
	}

	/// The current transform.
	pub fn transform(&self) -> ViewportTransform {
		self.transform
	}

	/// The limits this controller runs with.
	pub fn config(&self) -> &ViewportConfig {
		&self.config
	}

	/// Canvas size in pixels.
	pub fn size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	/// Records a new canvas size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// Maps a screen pixel to a world point.
	pub fn to_world(&self, screen: Point) -> Point {
		self.transform.to_world(screen)
	}

	/// Maps a world point to screen pixels.
	pub fn to_screen(&self, world: Point) -> Point {
		self.transform.to_screen(world)
	}

	fn screen_center(&self) -> Point {
		Point::new(self.width / 2.0, self.height / 2.0)
	}

	fn clamp_scale(&self, scale: f64) -> f64 {
		scale.clamp(self.config.min_zoom, self.config.max_zoom)
	}

	/// Scales by `factor` keeping the world point under `anchor` fixed.
	pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
		if !factor.is_finite() || factor <= 0.0 {
			return;
		}
		self.animation = None;
		let world = self.transform.to_world(anchor);
		let scale = self.clamp_scale(self.transform.scale * factor);
		self.transform = ViewportTransform {
			translate_x: anchor.x / scale - world.x,
			translate_y: anchor.y / scale - world.y,
			scale,
		};
	}

	/// One wheel event. Positive `delta_y` (scrolling down) zooms out.
	pub fn wheel(&mut self, delta_y: f64, anchor: Point) {
		if delta_y > 0.0 {
			self.zoom_at(1.0 / self.config.wheel_factor, anchor);
		} else if delta_y < 0.0 {
			self.zoom_at(self.config.wheel_factor, anchor);
		}
	}

	/// Starts a two-touch pinch.
	pub fn begin_pinch(&mut self, a: Point, b: Point) {
		self.pan_last = None;
		self.pinch = Some(PinchState {
			start_distance: a.distance(b).max(1.0),
			start_scale: self.transform.scale,
		});
	}

	/// Rescales relative to the finger spread at [`begin_pinch`](Self::begin_pinch),
	/// anchored at the midpoint.
	pub fn update_pinch(&mut self, a: Point, b: Point) {
		let Some(pinch) = &self.pinch else {
			return;
		};
		let target = pinch.start_scale * a.distance(b).max(1.0) / pinch.start_distance;
		let factor = self.clamp_scale(target) / self.transform.scale;
		self.zoom_at(factor, a.lerp(b, 0.5));
	}

	/// Ends the pinch.
	pub fn end_pinch(&mut self) {
		self.pinch = None;
	}

	/// Whether a pinch is in progress.
	pub fn is_pinching(&self) -> bool {
		self.pinch.is_some()
	}

	/// Starts a background pan at `screen`.
	pub fn begin_pan(&mut self, screen: Point) {
		self.animation = None;
		self.pan_last = Some(screen);
	}

	/// Follows the pointer during a pan. Ignored when no pan is active.
	pub fn pan_move(&mut self, screen: Point) {
		let Some(last) = self.pan_last else {
			return;
		};
		let delta = screen - last;
		self.transform.translate_x += delta.x / self.transform.scale;
		self.transform.translate_y += delta.y / self.transform.scale;
		self.pan_last = Some(screen);
	}

	/// Ends a background pan.
	pub fn end_pan(&mut self) {
		self.pan_last = None;
	}

	/// Whether a background pan is in progress.
	pub fn is_panning(&self) -> bool {
		self.pan_last.is_some()
	}

	/// Zooms in by `zoom_step` around the canvas centre.
	pub fn zoom_in(&mut self) {
		self.zoom_at(self.config.zoom_step, self.screen_center());
	}

	/// Zooms out by `zoom_step` around the canvas centre.
	pub fn zoom_out(&mut self) {
		self.zoom_at(1.0 / self.config.zoom_step, self.screen_center());
	}

	/// Animates back to the identity transform.
	pub fn reset_zoom(&mut self) {
		self.animate_to(ViewportTransform::IDENTITY);
	}

	/// Centres the view on world point `(x, y)` at the current scale.
	pub fn pan_to(&mut self, x: f64, y: f64) {
		self.animation = None;
		let center = self.screen_center();
		self.transform.translate_x = center.x / self.transform.scale - x;
		self.transform.translate_y = center.y / self.transform.scale - y;
	}

	/// Animates to a transform showing the world rectangle `min..max`.
	pub fn fit_to(&mut self, min: Point, max: Point) {
		let target = self.fit_transform(min, max);
		self.animate_to(target);
	}

	/// Transform that shows `min..max` centred with [`ViewportConfig::fit_padding`].
	pub fn fit_transform(&self, min: Point, max: Point) -> ViewportTransform {
		let pad = self.config.fit_padding;
		let span_x = (max.x - min.x).max(1.0);
		let span_y = (max.y - min.y).max(1.0);
		let avail_x = (self.width - 2.0 * pad).max(1.0);
		let avail_y = (self.height - 2.0 * pad).max(1.0);
		let scale = self.clamp_scale((avail_x / span_x).min(avail_y / span_y));
		let mid = min.lerp(max, 0.5);
		let center = self.screen_center();
		ViewportTransform {
			translate_x: center.x / scale - mid.x,
			translate_y: center.y / scale - mid.y,
			scale,
		}
	}

	fn animate_to(&mut self, to: ViewportTransform) {
		self.animation = Some(TransformAnimation {
			from: self.transform,
			to,
			started_at: None,
			duration_ms: self.config.reset_duration_ms,
		});
	}

	/// Whether a reset or fit animation is running.
	pub fn is_animating(&self) -> bool {
		self.animation.is_some()
	}

	/// Progresses a running animation to `now_ms`. Returns whether it is still running.
	pub fn advance(&mut self, now_ms: f64) -> bool {
		let Some(anim) = &mut self.animation else {
			return false;
		};
		let started = *anim.started_at.get_or_insert(now_ms);
		let t = if anim.duration_ms <= 0.0 {
			1.0
		} else {
			((now_ms - started) / anim.duration_ms).clamp(0.0, 1.0)
		};
		if t >= 1.0 {
			self.transform = anim.to;
			self.animation = None;
			return false;
		}
		self.transform = anim.from.lerp(&anim.to, ease_cubic_in_out(t));
		true
	}
}

fn ease_cubic_in_out(t: f64) -> f64 {
	if t < 0.5 {
		4.0 * t * t * t
	} else {
		1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const EPS: f64 = 1e-9;

	fn controller() -> ViewportController {
		ViewportController::new(ViewportConfig::default(), 800.0, 600.0)
	}

	fn close(a: Point, b: Point) -> bool {
		a.distance(b) < 1e-6
	}

	#[test]
	fn zoom_keeps_the_anchor_fixed() {
		let mut vp = controller();
		let anchor = Point::new(200.0, 150.0);
		let before = vp.to_world(anchor);
		vp.wheel(-1.0, anchor);
		assert!(vp.transform().scale > 1.0);
		assert!(close(vp.to_world(anchor), before));
		vp.wheel(3.0, anchor);
		assert!(close(vp.to_world(anchor), before));
	}

	#[test]
	fn zoom_is_clamped() {
		let mut vp = controller();
		for _ in 0..100 {
			vp.zoom_in();
		}
		assert!((vp.transform().scale - 4.0).abs() < EPS);
		for _ in 0..200 {
			vp.zoom_out();
		}
		assert!((vp.transform().scale - 0.1).abs() < EPS);
	}

	#[test]
	fn pan_moves_by_delta_over_scale() {
		let mut vp = controller();
		vp.zoom_at(2.0, Point::ZERO);
		vp.begin_pan(Point::new(100.0, 100.0));
		vp.pan_move(Point::new(140.0, 80.0));
		let t = vp.transform();
		assert!((t.translate_x - 20.0).abs() < EPS);
		assert!((t.translate_y + 10.0).abs() < EPS);
		vp.end_pan();
		vp.pan_move(Point::new(500.0, 500.0));
		assert_eq!(vp.transform(), t);
	}

	#[test]
	fn pan_to_centres_the_world_point() {
		let mut vp = controller();
		vp.zoom_at(0.5, Point::new(10.0, 10.0));
		vp.pan_to(300.0, -40.0);
		assert!(close(vp.to_screen(Point::new(300.0, -40.0)), Point::new(400.0, 300.0)));
	}

	#[test]
	fn reset_animates_to_identity_over_the_duration() {
		let mut vp = controller();
		vp.zoom_at(3.0, Point::new(50.0, 50.0));
		vp.reset_zoom();
		assert!(vp.advance(1_000.0));
		assert!(vp.advance(1_375.0));
		let mid = vp.transform().scale;
		assert!(mid > 1.0 && mid < 3.0);
		assert!(!vp.advance(1_750.0));
		assert_eq!(vp.transform(), ViewportTransform::IDENTITY);
		assert!(!vp.is_animating());
	}

	#[test]
	fn user_zoom_cancels_a_running_reset() {
		let mut vp = controller();
		vp.zoom_at(2.0, Point::ZERO);
		vp.reset_zoom();
		vp.advance(0.0);
		vp.wheel(-1.0, Point::ZERO);
		assert!(!vp.is_animating());
	}

	#[test]
	fn pinch_scales_with_finger_spread() {
		let mut vp = controller();
		vp.begin_pinch(Point::new(300.0, 300.0), Point::new(500.0, 300.0));
		vp.update_pinch(Point::new(200.0, 300.0), Point::new(600.0, 300.0));
		assert!((vp.transform().scale - 2.0).abs() < EPS);
		let mid = Point::new(400.0, 300.0);
		assert!(close(vp.to_screen(vp.to_world(mid)), mid));
		vp.end_pinch();
		assert!(!vp.is_pinching());
	}

	#[test]
	fn fit_shows_the_whole_rectangle() {
		let vp = controller();
		let t = vp.fit_transform(Point::new(-100.0, -50.0), Point::new(300.0, 250.0));
		let top_left = t.to_screen(Point::new(-100.0, -50.0));
		let bottom_right = t.to_screen(Point::new(300.0, 250.0));
		assert!(top_left.x >= 40.0 - EPS && top_left.y >= 40.0 - EPS);
		assert!(bottom_right.x <= 760.0 + EPS && bottom_right.y <= 560.0 + EPS);
	}

	#[test]
	fn easing_hits_its_endpoints() {
		assert_eq!(ease_cubic_in_out(0.0), 0.0);
		assert!((ease_cubic_in_out(1.0) - 1.0).abs() < EPS);
		assert!((ease_cubic_in_out(0.5) - 0.5).abs() < EPS);
	}
}
