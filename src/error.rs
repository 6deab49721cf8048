use std::path::PathBuf;

/// Every failure is fatal for the comic being processed: nothing is retried and no partial cover is written.
#[derive(thiserror::Error, Debug)]
pub enum CoverError {
	#[error("invalid comic id {0:?}")]
	InvalidId(String),

	#[error("comic not found: {}", path.display())]
	NotFound { path: PathBuf },

	#[error("no frontmatter found in {}", path.display())]
	MalformedRecord { path: PathBuf },

	#[error("missing {field} in frontmatter of {}", path.display())]
	IncompleteRecord { path: PathBuf, field: &'static str },

	#[error("page image not found: {}", path.display())]
	AssetMissing { path: PathBuf },

	#[error("layout overflow: {0}")]
	LayoutOverflow(String),

	#[error("failed to encode or decode {}: {source}", path.display())]
	Encoding {
		path: PathBuf,
		#[source]
		source: image::ImageError,
	},

	#[error("text overlay: {0}")]
	Render(String),

	#[error("layer references page {index}, but only {available} page images were prepared")]
	MissingPage { index: usize, available: usize },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Config(#[from] config::ConfigError),
}

pub type CoverResult<T> = Result<T, CoverError>;

impl CoverError {
	pub fn layout_overflow(msg: impl Into<String>) -> Self {
		Self::LayoutOverflow(msg.into())
	}

	pub fn render(msg: impl Into<String>) -> Self {
		Self::Render(msg.into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_names_the_offending_path() {
		let err = CoverError::AssetMissing { path: PathBuf::from("comics/001/p1.png") };
		assert_eq!(err.to_string(), "page image not found: comics/001/p1.png");

		let err = CoverError::IncompleteRecord {
			path: PathBuf::from("comics/001.md"),
			field: "pages",
		};
		assert!(err.to_string().contains("missing pages"));
		assert!(err.to_string().contains("comics/001.md"));
	}

	#[test]
	fn display_prefixes_are_stable() {
		assert!(CoverError::layout_overflow("x").to_string().starts_with("layout overflow:"));
		assert!(CoverError::render("x").to_string().starts_with("text overlay:"));
	}

	#[test]
	fn io_preserves_source() {
		let err = CoverError::from(std::io::Error::other("boom"));
		assert!(err.to_string().contains("boom"));
	}
}
