//! Source artwork clean-up: downscales, flattens and recompresses a comic's cover and page images in place.
//!
//! Each file is copied to a backup directory next to it before it is touched, and only replaced when the
//! re-encoded PNG is smaller.
use std::{
	fmt,
	path::{Path, PathBuf},
};

use image::{Rgb, RgbImage, imageops::FilterType};
use tracing::{error, info, warn};

use crate::{
	compose,
	config::{AppConfig, OptimizeConfig},
	error::{CoverError, CoverResult},
	record,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRole {
	Cover,
	Page,
}

impl fmt::Display for ImageRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ImageRole::Cover => write!(f, "cover"),
			ImageRole::Page => write!(f, "page"),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
	/// The smaller re-encode replaced the file.
	Optimized {
		from: (u32, u32),
		to: (u32, u32),
		bytes_before: u64,
		bytes_after: u64,
	},
	/// Re-encoding did not shrink the file, so it was left alone.
	AlreadyOptimal { bytes: u64 },
	/// Dry run; nothing was decoded or written.
	Planned,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptimizeReport {
	pub processed: usize,
	/// Declared in the record but absent on disk.
	pub skipped: usize,
	pub failed: usize,
}

/// Optimizes the cover (when the record names one) and then every page, in declaration order.
///
/// A missing image is skipped and a failing one is counted; neither stops the rest of the run.
pub fn optimize_comic(config: &AppConfig, comic_id: &str, dry_run: bool) -> CoverResult<OptimizeReport> {
	let record = record::read_record(&config.paths.content_dir, comic_id)?;
	let images: Vec<(ImageRole, &Path)> = record
		.cover
		.as_deref()
		.map(|cover| (ImageRole::Cover, cover))
		.into_iter()
		.chain(record.pages.iter().map(|page| (ImageRole::Page, page.as_path())))
		.collect();
	info!(comic = %record.id, images = images.len(), dry_run, "optimizing source images");

	let mut report = OptimizeReport::default();
	for (role, path) in images {
		if !path.is_file() {
			warn!(%role, path = %path.display(), "image not found, skipping");
			report.skipped += 1;
			continue;
		}

		match backup_original(path, &config.optimize, dry_run).and_then(|_| optimize_image(path, config.optimize.max_width, dry_run)) {
			Ok(outcome) => {
				log_outcome(role, path, &outcome);
				report.processed += 1;
			}
			Err(e) => {
				error!(%role, path = %path.display(), "failed to optimize: {e}");
				report.failed += 1;
			}
		}
	}
	Ok(report)
}

fn log_outcome(role: ImageRole, path: &Path, outcome: &Outcome) {
	match outcome {
		Outcome::Optimized {
			from,
			to,
			bytes_before,
			bytes_after,
		} => info!(
			%role,
			path = %path.display(),
			from = %format!("{}x{}", from.0, from.1),
			to = %format!("{}x{}", to.0, to.1),
			bytes_before,
			bytes_after,
			"optimized"
		),
		Outcome::AlreadyOptimal { bytes } => info!(%role, path = %path.display(), bytes, "already optimal"),
		Outcome::Planned => info!(%role, path = %path.display(), "would optimize"),
	}
}

/// `<dir>/<backup_dir>/<file name>` for an image at `<dir>/<file name>`.
pub fn backup_path(path: &Path, backup_dir: &str) -> CoverResult<PathBuf> {
	let file_name = path.file_name().ok_or_else(|| CoverError::AssetMissing { path: path.to_path_buf() })?;
	let dir = path.parent().unwrap_or_else(|| Path::new(""));
	Ok(dir.join(backup_dir).join(file_name))
}

/// Copies `path` into its backup directory once. An existing backup is never overwritten: it holds the untouched artwork.
pub fn backup_original(path: &Path, config: &OptimizeConfig, dry_run: bool) -> CoverResult<PathBuf> {
	let backup = backup_path(path, &config.backup_dir)?;
	if backup.exists() {
		warn!(backup = %backup.display(), "backup already exists, keeping it");
		return Ok(backup);
	}
	if dry_run {
		info!(from = %path.display(), to = %backup.display(), "would back up");
		return Ok(backup);
	}

	if let Some(dir) = backup.parent() {
		std::fs::create_dir_all(dir)?;
	}
	std::fs::copy(path, &backup)?;
	info!(backup = %backup.display(), "backed up");
	Ok(backup)
}

/// Re-encodes `path` as an opaque RGB PNG at maximum compression, no wider than `max_width`.
pub fn optimize_image(path: &Path, max_width: u32, dry_run: bool) -> CoverResult<Outcome> {
	if dry_run {
		return Ok(Outcome::Planned);
	}
	let encoding = |source| CoverError::Encoding { path: path.to_path_buf(), source };

	let bytes_before = std::fs::metadata(path)?.len();
	let img = image::open(path).map_err(encoding)?;
	let from = (img.width(), img.height());

	let flat = flatten_onto_white(&img.to_rgba8());
	let resized = match fit_width(from, max_width) {
		Some((width, height)) => image::imageops::resize(&flat, width, height, FilterType::Lanczos3),
		None => flat,
	};
	let to = resized.dimensions();

	let png = compose::encode_rgb_png(&resized, path)?;
	let bytes_after = png.len() as u64;
	if bytes_after >= bytes_before {
		return Ok(Outcome::AlreadyOptimal { bytes: bytes_before });
	}

	compose::write_atomically(path, &png)?;
	Ok(Outcome::Optimized {
		from,
		to,
		bytes_before,
		bytes_after,
	})
}

/// Target size when `width` exceeds `max_width`, keeping the aspect ratio. Never enlarges.
pub fn fit_width((width, height): (u32, u32), max_width: u32) -> Option<(u32, u32)> {
	if width <= max_width || max_width == 0 {
		return None;
	}
	let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round() as u32;
	Some((max_width, scaled.max(1)))
}

/// Composites every pixel onto opaque white and drops the alpha channel.
fn flatten_onto_white(img: &image::RgbaImage) -> RgbImage {
	RgbImage::from_fn(img.width(), img.height(), |x, y| {
		let [r, g, b, a] = img.get_pixel(x, y).0;
		let (a, inv) = (u16::from(a), u16::from(255 - a));
		let over = |c: u8| ((u16::from(c) * a + 255 * inv + 127) / 255) as u8;
		Rgb([over(r), over(g), over(b)])
	})
}
