//! Geometry of the cover: a row of page images on the left, a fixed-width text column on the right.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ M                                            │
//! │   ┌──────┐ G ┌──────┐    Tg  ┌────────────┐  │
//! │   │ page │   │ page │        │ text (Tw)  │  │
//! │   └──────┘   └──────┘        └────────────┘  │
//! │                                              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every page gets the same slot width; each is scaled to fit its slot and the images-area height.
//! The row is centered horizontally in the images area and vertically around its tallest page.
use derive_new::new;
use tracing::debug;

use crate::{
	config::LayoutConfig,
	error::{CoverError, CoverResult},
	inspect::ImageDescriptor,
	text::TextColumn,
};

/// Axis-aligned rectangle in canvas pixels. Positions are signed so borders may be outset past the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, new)]
pub struct Rect {
	pub left: i64,
	pub top: i64,
	pub width: u32,
	pub height: u32,
}

impl Rect {
	/// Grows the rectangle by `by` pixels on every side.
	pub fn outset(&self, by: u32) -> Self {
		Self {
			left: self.left - i64::from(by),
			top: self.top - i64::from(by),
			width: self.width + 2 * by,
			height: self.height + 2 * by,
		}
	}

	pub fn bottom(&self) -> i64 {
		self.top + i64::from(self.height)
	}

	pub fn right(&self) -> i64 {
		self.left + i64::from(self.width)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct PagePlacement {
	pub source: ImageDescriptor,
	/// Uniform scale applied to both axes before rounding.
	pub scale: f64,
	pub rect: Rect,
}

/// The complete geometry solution for one cover.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementPlan {
	pub canvas_width: u32,
	pub canvas_height: u32,
	pub border_width: u32,
	pub images_area: Rect,
	pub slot_width: u32,
	/// Height of the tallest scaled page; the row is centered on this, not on the slot height.
	pub tallest: u32,
	pub row_top: i64,
	pub pages: Vec<PagePlacement>,
	pub text: Rect,
	/// Relative to the top of the text column.
	pub divider_y: Option<u32>,
}

/// Largest uniform scale that fits `width × height` into `max_width × max_height`, with sides rounded independently.
pub fn scale_to_fit(width: u32, height: u32, max_width: u32, max_height: u32) -> (f64, u32, u32) {
	let scale = (f64::from(max_width) / f64::from(width)).min(f64::from(max_height) / f64::from(height));
	let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
	(scale, scaled(width), scaled(height))
}

/// Half of `slack`, rounded half away from zero.
fn centered(slack: i64) -> i64 {
	(slack as f64 / 2.0).round() as i64
}

pub fn plan(config: &LayoutConfig, pages: &[ImageDescriptor], column: &TextColumn) -> CoverResult<PlacementPlan> {
	let LayoutConfig {
		width,
		height,
		margin,
		gap,
		border_width,
		text_column_width,
		text_column_gap,
		text_column_top_margin,
	} = *config;

	let images_area_width = i64::from(width) - 2 * i64::from(margin) - i64::from(text_column_width) - i64::from(text_column_gap);
	let images_area_height = i64::from(height) - 2 * i64::from(margin);
	if images_area_width <= 0 || images_area_height <= 0 {
		return Err(CoverError::layout_overflow(format!(
			"{width}x{height} canvas leaves a {images_area_width}x{images_area_height} images area"
		)));
	}

	let n = pages.len() as i64;
	if n == 0 {
		return Err(CoverError::layout_overflow("no pages to place"));
	}
	let slot_width = (images_area_width - i64::from(gap) * (n - 1)).div_euclid(n);
	if slot_width <= 0 {
		return Err(CoverError::layout_overflow(format!(
			"{n} pages do not fit in a {images_area_width}px wide images area (slot width {slot_width})"
		)));
	}
	let (slot_width, images_area_height) = (slot_width as u32, images_area_height as u32);
	let images_area = Rect::new(i64::from(margin), i64::from(margin), images_area_width as u32, images_area_height);

	let scaled: Vec<(f64, u32, u32)> = pages
		.iter()
		.map(|p| scale_to_fit(p.width, p.height, slot_width, images_area_height))
		.collect();
	let tallest = scaled.iter().map(|&(_, _, h)| h).max().unwrap_or(0);
	let row_width: i64 = scaled.iter().map(|&(_, w, _)| i64::from(w)).sum::<i64>() + i64::from(gap) * (n - 1);

	let row_top = images_area.top + centered(i64::from(images_area_height) - i64::from(tallest));
	let mut x = images_area.left + centered(images_area_width - row_width);
	let mut placements = Vec::with_capacity(pages.len());
	for (source, &(scale, w, h)) in pages.iter().zip(&scaled) {
		let top = row_top + centered(i64::from(tallest) - i64::from(h));
		placements.push(PagePlacement {
			source: source.clone(),
			scale,
			rect: Rect::new(x, top, w, h),
		});
		x += i64::from(w) + i64::from(gap);
	}

	let text = Rect::new(
		images_area.right() + i64::from(text_column_gap),
		row_top + i64::from(text_column_top_margin),
		text_column_width,
		column.height.min(images_area_height),
	);

	debug!(slot_width, tallest, row_width, "computed page row");
	Ok(PlacementPlan {
		canvas_width: width,
		canvas_height: height,
		border_width,
		images_area,
		slot_width,
		tallest,
		row_top,
		pages: placements,
		text,
		divider_y: column.divider.map(|d| d.y),
	})
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;
	use crate::text::{TextColumn, TextStyle, Weight};

	fn page(width: u32, height: u32) -> ImageDescriptor {
		ImageDescriptor::new(PathBuf::from("page.png"), width, height)
	}

	fn column() -> TextColumn {
		let style = TextStyle::new(20, Weight::Normal, None);
		TextColumn::builder(10).line("Series", &style).line("#001", &style).build()
	}

	#[test]
	fn two_portrait_pages_on_default_canvas() {
		let plan = plan(&LayoutConfig::default(), &[page(800, 1000), page(800, 1000)], &column()).unwrap();

		assert_eq!(plan.images_area, Rect::new(40, 40, 740, 550));
		assert_eq!(plan.slot_width, 360);
		for p in &plan.pages {
			assert_eq!(p.scale, 0.45);
			assert_eq!((p.rect.width, p.rect.height), (360, 450));
		}
		assert_eq!(plan.tallest, 450);
		// (550 - 450) / 2
		assert_eq!(plan.row_top, 90);
		// row is 360 + 20 + 360 = 740 wide, so it starts flush with the margin
		assert_eq!(plan.pages[0].rect.left, 40);
		assert_eq!(plan.pages[1].rect.left, 420);
	}

	#[test]
	fn slots_fit_within_images_area() {
		let config = LayoutConfig::default();
		for n in 1..=12 {
			let pages = vec![page(640, 480); n];
			let plan = plan(&config, &pages, &column()).unwrap();
			let n = n as u32;
			assert!(plan.slot_width * n + config.gap * (n - 1) <= plan.images_area.width);
			for p in &plan.pages {
				assert!(p.rect.width <= plan.slot_width);
				assert!(p.rect.height <= plan.images_area.height);
				assert!(p.rect.left >= plan.images_area.left);
				assert!(p.rect.right() <= plan.images_area.right());
			}
		}
	}

	#[test]
	fn shorter_pages_are_centered_on_the_tallest() {
		let plan = plan(&LayoutConfig::default(), &[page(800, 1000), page(1000, 500), page(300, 1000)], &column()).unwrap();
		let tallest = plan.pages.iter().find(|p| p.rect.height == plan.tallest).unwrap();
		assert_eq!(tallest.rect.top, plan.row_top);
		assert!(tallest.rect.bottom() - plan.images_area.top <= i64::from(plan.images_area.height));

		for p in &plan.pages {
			let above = p.rect.top - plan.row_top;
			let below = plan.row_top + i64::from(plan.tallest) - p.rect.bottom();
			assert!((above - below).abs() <= 1, "slack {above}/{below} for {:?}", p.rect);
		}
	}

	#[test]
	fn row_is_centered_horizontally() {
		let plan = plan(&LayoutConfig::default(), &[page(500, 1000), page(500, 1000)], &column()).unwrap();
		let left_slack = plan.pages[0].rect.left - plan.images_area.left;
		let right_slack = plan.images_area.right() - plan.pages[1].rect.right();
		assert!(left_slack > 0);
		assert!((left_slack - right_slack).abs() <= 1);
		assert_eq!(plan.pages[1].rect.left - plan.pages[0].rect.right(), 20);
	}

	#[test]
	fn aspect_ratio_survives_rounding() {
		let (scale, w, h) = scale_to_fit(1333, 777, 360, 550);
		assert!(w <= 360 && h <= 550);
		let drift = (f64::from(w) - 1333.0 * scale).abs().max((f64::from(h) - 777.0 * scale).abs());
		assert!(drift <= 0.5);
	}

	#[test]
	fn text_column_sits_right_of_images_area() {
		let column = column();
		let plan = plan(&LayoutConfig::default(), &[page(800, 1000)], &column).unwrap();
		assert_eq!(plan.text.left, 40 + 740 + 40);
		assert_eq!(plan.text.top, plan.row_top + 40);
		assert_eq!(plan.text.width, 340);
		assert_eq!(plan.text.height, column.height);
	}

	#[test]
	fn text_height_is_clamped_to_images_area() {
		let style = TextStyle::new(100, Weight::Normal, None);
		let mut builder = TextColumn::builder(10);
		for _ in 0..10 {
			builder = builder.line("tall", &style);
		}
		let plan = plan(&LayoutConfig::default(), &[page(800, 1000)], &builder.build()).unwrap();
		assert_eq!(plan.text.height, 550);
	}

	#[test]
	fn too_many_pages_overflow() {
		let pages = vec![page(800, 1000); 40];
		assert!(matches!(plan(&LayoutConfig::default(), &pages, &column()), Err(CoverError::LayoutOverflow(_))));
	}

	#[test]
	fn degenerate_canvas_overflows() {
		let config = LayoutConfig {
			width: 400,
			..LayoutConfig::default()
		};
		assert!(matches!(plan(&config, &[page(10, 10)], &column()), Err(CoverError::LayoutOverflow(_))));
		assert!(matches!(plan(&LayoutConfig::default(), &[], &column()), Err(CoverError::LayoutOverflow(_))));
	}

	#[test]
	fn replanning_is_deterministic() {
		let pages = [page(1234, 987), page(640, 1600), page(777, 777)];
		let first = plan(&LayoutConfig::default(), &pages, &column()).unwrap();
		let second = plan(&LayoutConfig::default(), &pages, &column()).unwrap();
		assert_eq!(first, second);
	}
}
