//! Paints the placement plan onto a canvas and writes the finished cover.
use std::{
	io::Write as _,
	path::{Path, PathBuf},
};

use image::{
	DynamicImage, ImageEncoder as _, RgbImage, Rgba, RgbaImage,
	codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder},
	imageops::{self, FilterType},
};
use rayon::prelude::*;
use tracing::debug;

use crate::{
	config::{Palette, Paths, Rgb},
	error::{CoverError, CoverResult},
	layout::{PlacementPlan, Rect},
};

/// One paint operation. A cover is a `Vec<Layer>` in back-to-front order, built once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
	Border { rect: Rect },
	Page { index: usize, rect: Rect },
	Text { rect: Rect },
}

/// Each page's border goes down right before the page itself; the text overlay comes last.
pub fn layers(plan: &PlacementPlan) -> Vec<Layer> {
	let mut layers = Vec::with_capacity(plan.pages.len() * 2 + 1);
	for (index, page) in plan.pages.iter().enumerate() {
		if plan.border_width > 0 {
			layers.push(Layer::Border {
				rect: page.rect.outset(plan.border_width),
			});
		}
		layers.push(Layer::Page { index, rect: page.rect });
	}
	layers.push(Layer::Text { rect: plan.text });
	layers
}

/// Decodes every page and resamples it to its planned size, keeping plan order.
pub fn resize_pages(plan: &PlacementPlan) -> CoverResult<Vec<RgbaImage>> {
	plan.pages
		.par_iter()
		.map(|page| {
			let path = &page.source.path;
			let img = image::open(path).map_err(|source| CoverError::Encoding { path: path.clone(), source })?;
			Ok(img.resize_exact(page.rect.width, page.rect.height, FilterType::Lanczos3).to_rgba8())
		})
		.collect()
}

/// `pages` must hold one image per page layer, in plan order.
pub fn paint(plan: &PlacementPlan, layers: &[Layer], pages: &[RgbaImage], text: &tiny_skia::Pixmap, palette: &Palette) -> CoverResult<RgbaImage> {
	let mut canvas = RgbaImage::from_pixel(plan.canvas_width, plan.canvas_height, opaque(palette.background));

	for layer in layers {
		match *layer {
			Layer::Border { rect } => stroke_rect(&mut canvas, rect, plan.border_width, opaque(palette.border)),
			Layer::Page { index, rect } => {
				let page = pages.get(index).ok_or(CoverError::MissingPage { index, available: pages.len() })?;
				imageops::overlay(&mut canvas, page, rect.left, rect.top);
			}
			Layer::Text { rect } => blend_pixmap(&mut canvas, text, rect.left, rect.top),
		}
	}
	Ok(canvas)
}

fn opaque(Rgb([r, g, b]): Rgb) -> Rgba<u8> {
	Rgba([r, g, b, 255])
}

/// Fills the part of `rect` that lies on the canvas.
fn fill_rect(canvas: &mut RgbaImage, left: i64, top: i64, width: i64, height: i64, color: Rgba<u8>) {
	let x0 = left.clamp(0, i64::from(canvas.width()));
	let y0 = top.clamp(0, i64::from(canvas.height()));
	let x1 = (left + width).clamp(0, i64::from(canvas.width()));
	let y1 = (top + height).clamp(0, i64::from(canvas.height()));
	for y in y0..y1 {
		for x in x0..x1 {
			canvas.put_pixel(x as u32, y as u32, color);
		}
	}
}

/// Draws a `thickness` wide ring just inside `rect`.
fn stroke_rect(canvas: &mut RgbaImage, rect: Rect, thickness: u32, color: Rgba<u8>) {
	let (w, h, t) = (i64::from(rect.width), i64::from(rect.height), i64::from(thickness));
	fill_rect(canvas, rect.left, rect.top, w, t, color);
	fill_rect(canvas, rect.left, rect.bottom() - t, w, t, color);
	fill_rect(canvas, rect.left, rect.top, t, h, color);
	fill_rect(canvas, rect.right() - t, rect.top, t, h, color);
}

/// Source-over of a premultiplied pixmap onto the opaque canvas.
fn blend_pixmap(canvas: &mut RgbaImage, overlay: &tiny_skia::Pixmap, left: i64, top: i64) {
	for y in 0..overlay.height() {
		for x in 0..overlay.width() {
			let Some(src) = overlay.pixel(x, y) else { continue };
			let alpha = src.alpha();
			if alpha == 0 {
				continue;
			}
			let (cx, cy) = (left + i64::from(x), top + i64::from(y));
			if cx < 0 || cy < 0 || cx >= i64::from(canvas.width()) || cy >= i64::from(canvas.height()) {
				continue;
			}

			let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
			let inv = u16::from(255 - alpha);
			for (d, s) in dst.0.iter_mut().zip([src.red(), src.green(), src.blue()]) {
				*d = (u16::from(s) + (u16::from(*d) * inv + 127) / 255) as u8;
			}
		}
	}
}

/// Scales to cover `width × height` and center-crops. Returns the image untouched when it already has that size.
pub fn cover_fit(img: RgbaImage, width: u32, height: u32) -> RgbaImage {
	let (img_width, img_height) = img.dimensions();
	if (img_width, img_height) == (width, height) {
		return img;
	}
	debug!(from = ?(img_width, img_height), to = ?(width, height), "resampling canvas to target size");

	let img_ratio = f64::from(img_width) / f64::from(img_height);
	let target_ratio = f64::from(width) / f64::from(height);
	let (scaled_width, scaled_height) = if img_ratio > target_ratio {
		(((f64::from(height) * img_ratio).round() as u32).max(width), height)
	} else {
		(width, ((f64::from(width) / img_ratio).round() as u32).max(height))
	};

	let resized = imageops::resize(&img, scaled_width, scaled_height, FilterType::Lanczos3);
	let x_offset = (scaled_width - width) / 2;
	let y_offset = (scaled_height - height) / 2;
	imageops::crop_imm(&resized, x_offset, y_offset, width, height).to_image()
}

/// Lossless RGB PNG at maximum compression. `path` only labels errors.
pub fn encode_png(img: RgbaImage, path: &Path) -> CoverResult<Vec<u8>> {
	encode_rgb_png(&DynamicImage::ImageRgba8(img).into_rgb8(), path)
}

pub fn encode_rgb_png(rgb: &RgbImage, path: &Path) -> CoverResult<Vec<u8>> {
	let mut buf = Vec::new();
	PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive)
		.write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)
		.map_err(|source| CoverError::Encoding { path: path.to_path_buf(), source })?;
	Ok(buf)
}

/// `<assets_dir>/<id>/<file_prefix>-<id>-cover.png`
pub fn output_path(paths: &Paths, id: &str) -> PathBuf {
	paths.assets_dir.join(id).join(format!("{}-{id}-cover.png", paths.file_prefix))
}

/// Replaces `path` with `bytes` through a temp file in the same directory, so a failed write never leaves a partial cover.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> CoverResult<()> {
	let dir = match path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir,
		_ => Path::new("."),
	};
	std::fs::create_dir_all(dir)?;

	let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
	tmp.write_all(bytes)?;
	tmp.as_file().sync_all()?;
	tmp.persist(path).map_err(|e| e.error)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;
	use crate::{
		config::LayoutConfig,
		inspect::ImageDescriptor,
		layout,
		text::{TextColumn, TextStyle, Weight},
	};

	fn small_plan() -> PlacementPlan {
		let config = LayoutConfig {
			width: 120,
			height: 60,
			margin: 10,
			gap: 4,
			border_width: 1,
			text_column_width: 30,
			text_column_gap: 6,
			text_column_top_margin: 2,
		};
		let pages = [
			ImageDescriptor::new(PathBuf::from("a.png"), 20, 40),
			ImageDescriptor::new(PathBuf::from("b.png"), 20, 20),
		];
		let column = TextColumn::builder(2).line("x", &TextStyle::new(8, Weight::Normal, None)).build();
		layout::plan(&config, &pages, &column).unwrap()
	}

	#[test]
	fn layers_are_border_then_page_then_text() {
		let plan = small_plan();
		let layers = layers(&plan);

		assert_eq!(layers.len(), 5);
		assert_eq!(layers[0], Layer::Border { rect: plan.pages[0].rect.outset(1) });
		assert_eq!(layers[1], Layer::Page { index: 0, rect: plan.pages[0].rect });
		assert_eq!(layers[2], Layer::Border { rect: plan.pages[1].rect.outset(1) });
		assert_eq!(layers[3], Layer::Page { index: 1, rect: plan.pages[1].rect });
		assert_eq!(layers[4], Layer::Text { rect: plan.text });
	}

	#[test]
	fn paint_places_borders_pages_and_background() {
		let plan = small_plan();
		let palette = Palette::default();
		let pages: Vec<RgbaImage> = plan
			.pages
			.iter()
			.map(|p| RgbaImage::from_pixel(p.rect.width, p.rect.height, Rgba([255, 0, 0, 255])))
			.collect();
		let text = tiny_skia::Pixmap::new(plan.text.width, plan.text.height.max(1)).unwrap();

		let canvas = paint(&plan, &layers(&plan), &pages, &text, &palette).unwrap();
		assert_eq!(canvas.dimensions(), (120, 60));

		let first = plan.pages[0].rect;
		assert_eq!(*canvas.get_pixel(0, 0), opaque(palette.background));
		assert_eq!(*canvas.get_pixel(first.left as u32, first.top as u32), Rgba([255, 0, 0, 255]));
		assert_eq!(*canvas.get_pixel(first.left as u32 - 1, first.top as u32 - 1), opaque(palette.border));
		assert_eq!(*canvas.get_pixel(first.right() as u32, first.bottom() as u32), opaque(palette.border));
		assert_eq!(*canvas.get_pixel(first.right() as u32 + 1, first.top as u32), opaque(palette.background));
	}

	#[test]
	fn paint_rejects_layers_without_a_prepared_page() {
		let plan = small_plan();
		let only_first = vec![RgbaImage::from_pixel(plan.pages[0].rect.width, plan.pages[0].rect.height, Rgba([255, 0, 0, 255]))];
		let text = tiny_skia::Pixmap::new(plan.text.width, plan.text.height.max(1)).unwrap();

		let err = paint(&plan, &layers(&plan), &only_first, &text, &Palette::default()).unwrap_err();
		assert!(matches!(err, CoverError::MissingPage { index: 1, available: 1 }));
	}

	#[test]
	fn text_overlay_blends_over_background() {
		let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
		let mut overlay = tiny_skia::Pixmap::new(2, 2).unwrap();
		overlay.fill(tiny_skia::Color::from_rgba8(0, 0, 0, 255));

		blend_pixmap(&mut canvas, &overlay, 3, 3);
		assert_eq!(*canvas.get_pixel(3, 3), Rgba([0, 0, 0, 255]));
		assert_eq!(*canvas.get_pixel(2, 2), Rgba([255, 255, 255, 255]));

		let mut half = tiny_skia::Pixmap::new(1, 1).unwrap();
		half.fill(tiny_skia::Color::from_rgba8(0, 0, 0, 128));
		blend_pixmap(&mut canvas, &half, 0, 0);
		assert_eq!(*canvas.get_pixel(0, 0), Rgba([127, 127, 127, 255]));
	}

	#[test]
	fn cover_fit_is_noop_at_target_size() {
		let img = RgbaImage::from_fn(6, 4, |x, y| Rgba([x as u8, y as u8, 0, 255]));
		assert_eq!(cover_fit(img.clone(), 6, 4), img);
	}

	#[test]
	fn cover_fit_crops_to_exact_size() {
		let img = RgbaImage::from_pixel(13, 4, Rgba([9, 9, 9, 255]));
		assert_eq!(cover_fit(img, 6, 4).dimensions(), (6, 4));

		let img = RgbaImage::from_pixel(5, 9, Rgba([9, 9, 9, 255]));
		assert_eq!(cover_fit(img, 6, 4).dimensions(), (6, 4));
	}

	#[test]
	fn encoded_png_is_rgb_and_decodes_back() {
		let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
		let bytes = encode_png(img, Path::new("out.png")).unwrap();

		let decoded = image::load_from_memory(&bytes).unwrap();
		assert_eq!(decoded.color(), image::ColorType::Rgb8);
		assert_eq!(decoded.to_rgb8().get_pixel(2, 1).0, [10, 20, 30]);
	}

	#[test]
	fn output_path_encodes_prefix_and_id() {
		let paths = Paths::default();
		assert_eq!(
			output_path(&paths, "001"),
			PathBuf::from("src/assets/comics/001/jeromeabel-cc0-leconceptdelapreuve-001-cover.png")
		);
	}

	#[test]
	fn atomic_write_replaces_existing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("cover.png");

		write_atomically(&path, b"first").unwrap();
		write_atomically(&path, b"second").unwrap();
		assert_eq!(std::fs::read(&path).unwrap(), b"second");
		assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
	}
}
