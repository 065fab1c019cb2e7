//! Canvas painting for the frame graph.
//!
//! Draws the render scene in passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Links, then highlighted links on top, then the assignment preview
//! 3. Nodes with their pin rings, selected node last
//! 4. Labels
//!
//! Everything after the background is drawn in world space under the
//! viewport transform, with sizes taken from [`ScaledValues`].

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::adapter::FRAME_LINK;
use super::model::Point;
use super::scale::ScaledValues;
use super::state::ForceGraphState;
use super::sync::{LinkVisual, NodeVisual};
use super::theme::{Color, Theme};

/// Paints one frame.
pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let scene = state.scene();
	let transform = scene.transform();
	let scale = ScaledValues::new(state.scale(), transform.scale);
	let (width, height) = state.viewport().size();

	draw_background(ctx, theme, width, height);

	ctx.save();
	let _ = ctx.scale(transform.scale, transform.scale);
	let _ = ctx.translate(transform.translate_x, transform.translate_y);

	for link in scene.links().iter().filter(|l| !l.highlighted) {
		draw_link(ctx, link, &scale, theme);
	}
	for link in scene.links().iter().filter(|l| l.highlighted) {
		draw_link(ctx, link, &scale, theme);
	}
	if let Some(preview) = scene.preview() {
		draw_preview(ctx, preview.from, preview.to, &scale, theme);
	}

	for node in scene.nodes().iter().filter(|n| !n.selected) {
		draw_node(ctx, node, &scale, theme);
	}
	for node in scene.nodes().iter().filter(|n| n.selected) {
		draw_node(ctx, node, &scale, theme);
	}

	if scale.label_alpha > 0.0 {
		for node in scene.nodes() {
			draw_labels(ctx, node, &scale, theme);
		}
	}

	ctx.restore();
}

fn draw_background(ctx: &CanvasRenderingContext2d, theme: &Theme, width: f64, height: f64) {
	let bg = &theme.background;
	let gradient = bg
		.use_gradient
		.then(|| {
			ctx.create_radial_gradient(
				width / 2.0,
				height / 2.0,
				0.0,
				width / 2.0,
				height / 2.0,
				width.max(height) * 0.8,
			)
			.ok()
		})
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &bg.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &bg.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&bg.color.to_css()),
	}
	ctx.fill_rect(0.0, 0.0, width, height);
}

fn draw_link(
	ctx: &CanvasRenderingContext2d,
	link: &LinkVisual,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let delta = link.target - link.source;
	let dist = delta.length();
	if dist < scale.node_radius * 2.0 {
		return;
	}
	let unit = delta * (1.0 / dist);

	let (color, width) = if link.highlighted {
		(theme.link.highlight, scale.highlight_width)
	} else if link.kind == FRAME_LINK {
		(theme.link.frame_color, scale.link_width)
	} else {
		(theme.link.color, scale.link_width)
	};

	let start = link.source + unit * scale.node_radius;
	let tip = link.target - unit * scale.node_radius;
	let back = tip - unit * scale.arrow_size;

	ctx.set_stroke_style_str(&color.to_css());
	ctx.set_line_width(width);
	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	ctx.line_to(back.x, back.y);
	ctx.stroke();

	let side = Point::new(-unit.y, unit.x) * (scale.arrow_size * 0.5);
	let (left, right) = (back + side, back - side);
	ctx.set_fill_style_str(&color.to_css());
	ctx.begin_path();
	ctx.move_to(tip.x, tip.y);
	ctx.line_to(left.x, left.y);
	ctx.line_to(right.x, right.y);
	ctx.close_path();
	ctx.fill();

	if let Some(label) = &link.label {
		if scale.pin_label_alpha > 0.0 || link.highlighted {
			let mid = link.source.lerp(link.target, 0.5);
			ctx.set_fill_style_str(&theme.link.label.to_css());
			ctx.set_font(&scale.pin_font);
			let nudge = 3.0 * scale.ring_width;
			let _ = ctx.fill_text(label, mid.x + nudge, mid.y - nudge);
		}
	}
}

fn draw_preview(
	ctx: &CanvasRenderingContext2d,
	from: Point,
	to: Point,
	scale: &ScaledValues,
	theme: &Theme,
) {
	ctx.set_stroke_style_str(&theme.link.preview.to_css());
	ctx.set_line_width(scale.highlight_width);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(scale.preview_dash.0),
		&JsValue::from_f64(scale.preview_dash.1),
	));
	ctx.begin_path();
	ctx.move_to(from.x, from.y);
	ctx.line_to(to.x, to.y);
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	ctx.begin_path();
	let _ = ctx.arc(from.x, from.y, scale.node_radius, 0.0, 2.0 * PI);
	ctx.set_stroke_style_str(&theme.link.preview.with_alpha(0.5).to_css());
	ctx.stroke();
}

fn fill_circle(
	ctx: &CanvasRenderingContext2d,
	at: Point,
	radius: f64,
	color: Color,
	gradient: bool,
) {
	ctx.begin_path();
	let _ = ctx.arc(at.x, at.y, radius, 0.0, 2.0 * PI);
	let shaded = gradient
		.then(|| {
			ctx.create_radial_gradient(
				at.x - radius * 0.3,
				at.y - radius * 0.3,
				0.0,
				at.x,
				at.y,
				radius,
			)
			.ok()
		})
		.flatten();
	match shaded {
		Some(g) => {
			let _ = g.add_color_stop(0.0, &color.lighten(0.4).to_css());
			let _ = g.add_color_stop(0.7, &color.to_css());
			let _ = g.add_color_stop(1.0, &color.darken(0.2).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&g);
		}
		None => ctx.set_fill_style_str(&color.to_css()),
	}
	ctx.fill();
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	node: &NodeVisual,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let style = &theme.node;
	fill_circle(ctx, node.position, scale.node_radius, style.fill(node.kind), style.use_gradient);

	if node.pinned {
		ctx.begin_path();
		let _ = ctx.arc(node.position.x, node.position.y, scale.node_radius, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(&style.pinned_border.to_css());
		ctx.set_line_width(scale.ring_width * 0.5);
		ctx.stroke();
	}

	if node.selected {
		ctx.begin_path();
		let _ = ctx.arc(
			node.position.x,
			node.position.y,
			scale.node_radius + scale.ring_width * 2.0,
			0.0,
			2.0 * PI,
		);
		ctx.set_stroke_style_str(&style.selection_ring.to_css());
		ctx.set_line_width(scale.ring_width);
		ctx.stroke();
	}

	for pin in &node.pins {
		ctx.begin_path();
		let _ = ctx.arc(pin.position.x, pin.position.y, scale.pin_radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&theme.pin.fill.to_css());
		ctx.fill();
		ctx.set_stroke_style_str(&theme.pin.stroke.to_css());
		ctx.set_line_width(scale.ring_width * 0.5);
		ctx.stroke();
	}
}

fn draw_labels(
	ctx: &CanvasRenderingContext2d,
	node: &NodeVisual,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let alpha = if node.selected { 1.0 } else { scale.label_alpha };
	ctx.set_global_alpha(alpha);
	ctx.set_fill_style_str(&theme.node.label.to_css());
	ctx.set_font(&scale.label_font);
	let _ = ctx.fill_text(
		&node.label,
		node.position.x + scale.node_radius + 4.0 * scale.ring_width,
		node.position.y + 3.0 * scale.ring_width,
	);

	if scale.pin_label_alpha > 0.0 {
		ctx.set_global_alpha(scale.pin_label_alpha);
		ctx.set_fill_style_str(&theme.pin.label.to_css());
		ctx.set_font(&scale.pin_font);
		for pin in &node.pins {
			let _ = ctx.fill_text(
				&pin.name,
				pin.position.x + scale.pin_radius * 1.5,
				pin.position.y - scale.pin_radius,
			);
		}
	}
	ctx.set_global_alpha(1.0);
}
