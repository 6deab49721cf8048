//! The right-hand text column: stacked single-line labels, rendered as SVG and rasterized with resvg.
use std::{path::Path, sync::Arc};

use derive_new::new;
use tracing::debug;

use crate::{
	config::{AppConfig, Palette, Rgb, Typography},
	error::{CoverError, CoverResult},
	record::ComicRecord,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Weight {
	#[default]
	Normal,
	Medium,
}

impl Weight {
	pub fn css(self) -> u16 {
		match self {
			Weight::Normal => 400,
			Weight::Medium => 500,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, new)]
pub struct TextStyle {
	pub font_size: u32,
	pub weight: Weight,
	/// `None` falls back to the palette's ink.
	pub fill: Option<Rgb>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextLine {
	pub text: String,
	/// Top of the line, relative to the top of the column.
	pub y: u32,
	pub font_size: u32,
	pub weight: Weight,
	pub fill: Option<Rgb>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Divider {
	pub y: u32,
	pub thickness: u32,
}

/// Lines in paint order, top to bottom.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextColumn {
	pub lines: Vec<TextLine>,
	pub divider: Option<Divider>,
	/// Offset just below the last line.
	pub height: u32,
}

impl TextColumn {
	pub fn builder(line_gap: u32) -> TextColumnBuilder {
		TextColumnBuilder {
			line_gap,
			cursor: 0,
			after_line: false,
			column: TextColumn::default(),
		}
	}
}

#[derive(Debug)]
pub struct TextColumnBuilder {
	line_gap: u32,
	cursor: u32,
	after_line: bool,
	column: TextColumn,
}

impl TextColumnBuilder {
	/// Consecutive lines are separated by the line gap; a divider replaces it.
	pub fn line(mut self, text: impl Into<String>, style: &TextStyle) -> Self {
		if self.after_line {
			self.cursor += self.line_gap;
		}
		self.column.lines.push(TextLine {
			text: text.into(),
			y: self.cursor,
			font_size: style.font_size,
			weight: style.weight,
			fill: style.fill,
		});
		self.cursor += style.font_size;
		self.after_line = true;
		self
	}

	/// Horizontal rule with `margin` above and below. Only the last divider is kept.
	pub fn divider(mut self, margin: u32, thickness: u32) -> Self {
		self.cursor += margin;
		self.column.divider = Some(Divider { y: self.cursor, thickness });
		self.cursor += thickness + margin;
		self.after_line = false;
		self
	}

	pub fn build(mut self) -> TextColumn {
		self.column.height = self.column.lines.last().map_or(0, |l| l.y + l.font_size);
		self.column
	}
}

/// Series name and episode above the divider; credits, license and date below it.
pub fn cover_column(config: &AppConfig, record: &ComicRecord) -> TextColumn {
	let Typography {
		series_size,
		episode_size,
		credits_size,
		line_gap,
		divider_margin,
		divider_thickness,
		..
	} = config.typography;
	let credits = TextStyle::new(credits_size, Weight::Normal, Some(config.palette.credits));

	TextColumn::builder(line_gap)
		.line(&config.credits.series_name, &TextStyle::new(series_size, Weight::Normal, None))
		.line(format!("#{}", record.id), &TextStyle::new(episode_size, Weight::Medium, None))
		.divider(divider_margin, divider_thickness)
		.line(&config.credits.author, &credits)
		.line(&config.credits.license, &credits)
		.line(&record.date, &credits)
		.build()
}

pub fn escape_markup(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&apos;")
}

pub fn column_svg(column: &TextColumn, width: u32, height: u32, typography: &Typography, palette: &Palette) -> String {
	let family = escape_markup(&typography.font_family);
	let divider = column
		.divider
		.map(|Divider { y, thickness }| format!(r#"<rect x="0" y="{y}" width="{width}" height="{thickness}" fill="{}" />"#, palette.divider))
		.unwrap_or_default();

	let lines = column
		.lines
		.iter()
		.map(|line| {
			format!(
				r#"<text x="0" y="{}" dominant-baseline="hanging" font-family="{family}, monospace" font-weight="{}" font-size="{}px" fill="{}">{}</text>"#,
				line.y,
				line.weight.css(),
				line.font_size,
				line.fill.unwrap_or(palette.ink),
				escape_markup(&line.text),
			)
		})
		.collect::<Vec<_>>()
		.join("\n  ");

	format!(
		r#"<?xml version="1.0" encoding="UTF-8"?>
<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg">
  {divider}
  {lines}
</svg>"#
	)
}

/// Rasterizes overlays with a font database built once per run.
pub struct TextRenderer {
	fontdb: Arc<fontdb::Database>,
}

impl TextRenderer {
	pub fn new(font_dir: Option<&Path>) -> Self {
		let mut fontdb = fontdb::Database::new();
		fontdb.load_system_fonts();
		if let Some(dir) = font_dir {
			fontdb.load_fonts_dir(dir);
		}
		debug!(faces = fontdb.len(), "loaded fonts");
		Self { fontdb: Arc::new(fontdb) }
	}

	pub fn render(&self, svg: &str, width: u32, height: u32) -> CoverResult<tiny_skia::Pixmap> {
		let mut options = usvg::Options::default();
		options.fontdb = Arc::clone(&self.fontdb);

		let tree = usvg::Tree::from_str(svg, &options).map_err(|e| CoverError::render(format!("failed to parse overlay: {e}")))?;
		let mut pixmap =
			tiny_skia::Pixmap::new(width, height).ok_or_else(|| CoverError::render(format!("cannot allocate a {width}x{height} overlay")))?;
		resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
		Ok(pixmap)
	}
}
