use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Deserializer};

use crate::error::CoverResult;

/// Everything the cover pipeline needs that isn't read from the comic record itself.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	pub paths: Paths,
	pub layout: LayoutConfig,
	pub typography: Typography,
	pub palette: Palette,
	pub credits: Credits,
	pub optimize: OptimizeConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Paths {
	/// Directory holding `<id>.md` records.
	pub content_dir: PathBuf,
	/// Covers land in `<assets_dir>/<id>/`.
	pub assets_dir: PathBuf,
	/// Series/license tag encoded in the output file name.
	pub file_prefix: String,
	/// Extra fonts loaded on top of the system ones.
	pub font_dir: Option<PathBuf>,
}

impl Default for Paths {
	fn default() -> Self {
		Self {
			content_dir: PathBuf::from("src/content/comics"),
			assets_dir: PathBuf::from("src/assets/comics"),
			file_prefix: "jeromeabel-cc0-leconceptdelapreuve".to_owned(),
			font_dir: None,
		}
	}
}

/// Canvas geometry, in pixels. The layout engine is a pure function of this and its inputs.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
	pub width: u32,
	pub height: u32,
	pub margin: u32,
	/// Between adjacent pages.
	pub gap: u32,
	pub border_width: u32,
	pub text_column_width: u32,
	/// Between the images area and the text column.
	pub text_column_gap: u32,
	/// Offset of the text column below the top of the page row.
	pub text_column_top_margin: u32,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			width: 1200,
			height: 630,
			margin: 40,
			gap: 20,
			border_width: 1,
			text_column_width: 340,
			text_column_gap: 40,
			text_column_top_margin: 40,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Typography {
	pub font_family: String,
	pub series_size: u32,
	pub episode_size: u32,
	pub credits_size: u32,
	pub line_gap: u32,
	pub divider_margin: u32,
	pub divider_thickness: u32,
}

impl Default for Typography {
	fn default() -> Self {
		Self {
			font_family: "Inconsolata".to_owned(),
			series_size: 20,
			episode_size: 24,
			credits_size: 14,
			line_gap: 10,
			divider_margin: 22,
			divider_thickness: 1,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Palette {
	pub background: Rgb,
	pub border: Rgb,
	/// Default text fill.
	pub ink: Rgb,
	pub credits: Rgb,
	pub divider: Rgb,
}

impl Default for Palette {
	fn default() -> Self {
		Self {
			background: Rgb([0xff, 0xff, 0xff]),
			border: Rgb([0x33, 0x33, 0x33]),
			ink: Rgb([0x00, 0x00, 0x00]),
			credits: Rgb([0x88, 0x88, 0x88]),
			divider: Rgb([0xb5, 0xb5, 0xb5]),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Credits {
	pub series_name: String,
	pub author: String,
	pub license: String,
}

impl Default for Credits {
	fn default() -> Self {
		Self {
			series_name: "Le concept de la preuve".to_owned(),
			author: "Jérôme Abel".to_owned(),
			license: "Creative Commons CC0".to_owned(),
		}
	}
}

/// Source artwork limits applied by `optimize_images`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OptimizeConfig {
	/// Wider images are downscaled to this width; narrower ones are only re-encoded.
	pub max_width: u32,
	/// Name of the backup directory created next to each image.
	pub backup_dir: String,
}

impl Default for OptimizeConfig {
	fn default() -> Self {
		Self {
			max_width: 1280,
			backup_dir: "original".to_owned(),
		}
	}
}

/// Opaque color, written as `#rrggbb` in config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl FromStr for Rgb {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let hex = s.trim().trim_start_matches('#');
		if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
			return Err(format!("invalid color {s:?}, expected #rrggbb"));
		}
		let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("invalid color {s:?}: {e}"));
		Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
	}
}

impl fmt::Display for Rgb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [r, g, b] = self.0;
		write!(f, "#{r:02x}{g:02x}{b:02x}")
	}
}

impl<'de> Deserialize<'de> for Rgb {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>, {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum RgbHelper {
			Hex(String),
			Channels([u8; 3]),
		}

		Ok(match RgbHelper::deserialize(deserializer)? {
			RgbHelper::Hex(s) => s.parse().map_err(serde::de::Error::custom)?,
			RgbHelper::Channels(channels) => Rgb(channels),
		})
	}
}

impl AppConfig {
	/// Layers, lowest precedence first: built-in defaults, the XDG config dir, `./comic_cover.*` (or `path` when given), then `COMIC_COVER__*` env vars.
	pub fn read(path: Option<PathBuf>) -> CoverResult<Self> {
		Self::read_layered(path, "COMIC_COVER")
	}

	fn read_layered(path: Option<PathBuf>, env_prefix: &str) -> CoverResult<Self> {
		let app_name = env!("CARGO_PKG_NAME");
		let mut builder = config::Config::builder();

		match path {
			Some(path) => {
				builder = builder.add_source(config::File::from(path).required(true));
			}
			None => {
				let xdg_dirs = xdg::BaseDirectories::with_prefix(app_name);
				if let Some(conf_dir) = xdg_dirs.get_config_home() {
					builder = builder.add_source(config::File::from(conf_dir.join("config")).required(false));
				}
				builder = builder.add_source(config::File::with_name(app_name).required(false));
			}
		}

		let raw = builder
			.add_source(config::Environment::with_prefix(env_prefix).separator("__").try_parsing(true))
			.build()?;
		Ok(raw.try_deserialize()?)
	}
}
