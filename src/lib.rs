//! Builds the social-preview cover of a comic: its pages side by side, a credits column on the right.
//!
//! The pipeline is strictly sequential and every stage hands immutable data to the next:
//! [`record`] → [`inspect`] → [`layout`] → [`text`] → [`compose`].
//!
//! [`optimize`] prepares the source artwork the pipeline reads, and runs on its own.
pub mod compose;
pub mod config;
pub mod error;
pub mod inspect;
pub mod layout;
pub mod optimize;
pub mod record;
pub mod text;

use std::path::PathBuf;

use tracing::info;

pub use crate::{
	config::AppConfig,
	error::{CoverError, CoverResult},
};

/// Renders the cover for `comic_id` and returns where it was written.
///
/// Either a complete cover replaces the previous one, or nothing is written.
pub fn generate_cover(config: &AppConfig, comic_id: &str) -> CoverResult<PathBuf> {
	let record = record::read_record(&config.paths.content_dir, comic_id)?;
	info!(title = %record.title, date = %record.date, pages = record.pages.len(), "read comic {}", record.id);

	let pages = inspect::probe_all(&record.pages)?;
	let column = text::cover_column(config, &record);
	let plan = layout::plan(&config.layout, &pages, &column)?;
	info!(
		canvas = %format!("{}x{}", plan.canvas_width, plan.canvas_height),
		slot_width = plan.slot_width,
		tallest = plan.tallest,
		"computed layout"
	);

	let svg = text::column_svg(&column, plan.text.width, plan.text.height, &config.typography, &config.palette);
	let overlay = text::TextRenderer::new(config.paths.font_dir.as_deref()).render(&svg, plan.text.width, plan.text.height)?;
	let resized = compose::resize_pages(&plan)?;

	let layers = compose::layers(&plan);
	let canvas = compose::paint(&plan, &layers, &resized, &overlay, &config.palette)?;
	let canvas = compose::cover_fit(canvas, plan.canvas_width, plan.canvas_height);

	let output = compose::output_path(&config.paths, &record.id);
	let png = compose::encode_png(canvas, &output)?;
	compose::write_atomically(&output, &png)?;
	info!(path = %output.display(), bytes = png.len(), "cover written");
	Ok(output)
}
