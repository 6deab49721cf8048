use std::path::{Path, PathBuf};

use derive_new::new;
use rayon::prelude::*;

use crate::error::{CoverError, CoverResult};

#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct ImageDescriptor {
	pub path: PathBuf,
	pub width: u32,
	pub height: u32,
}

/// Reads pixel dimensions from the image header without decoding pixel data.
pub fn probe(path: &Path) -> CoverResult<ImageDescriptor> {
	if !path.is_file() {
		return Err(CoverError::AssetMissing { path: path.to_path_buf() });
	}
	let encoding = |source| CoverError::Encoding { path: path.to_path_buf(), source };

	let (width, height) = image::ImageReader::open(path)?
		.with_guessed_format()?
		.into_dimensions()
		.map_err(encoding)?;
	if width == 0 || height == 0 {
		return Err(encoding(image::ImageError::Limits(image::error::LimitError::from_kind(
			image::error::LimitErrorKind::DimensionError,
		))));
	}
	Ok(ImageDescriptor::new(path.to_path_buf(), width, height))
}

/// Reads every page header in parallel. Results, and the error reported when several pages fail, follow declaration order.
pub fn probe_all(pages: &[PathBuf]) -> CoverResult<Vec<ImageDescriptor>> {
	let results: Vec<CoverResult<ImageDescriptor>> = pages.par_iter().map(|p| probe(p)).collect();
	results.into_iter().collect()
}
