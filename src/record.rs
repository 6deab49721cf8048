//! Comic records: markdown files whose YAML frontmatter names the title, date and page images.
//!
//! ```text
//! ---
//! title: "La preuve par neuf"
//! date: 2024-03-01
//! cover: ./001/cover.png
//! pages:
//!   - ./001/page-1.png
//!   - ./001/page-2.png
//! ---
//! ```
use std::{
	io::ErrorKind,
	path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::error::{CoverError, CoverResult};

/// One comic, parsed once per invocation and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComicRecord {
	pub id: String,
	pub title: String,
	/// Kept verbatim: it is printed on the cover, not computed with.
	pub date: String,
	/// Resolved against the record's own directory, in declaration order.
	pub pages: Vec<PathBuf>,
	/// Source artwork of the cover, if the record names one. Only the image optimizer touches it.
	pub cover: Option<PathBuf>,
}

/// Header fields as written, before path resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frontmatter {
	pub title: String,
	pub date: String,
	pub pages: Vec<String>,
	pub cover: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseFailure {
	MissingHeader,
	MissingField(&'static str),
}

/// The header as YAML hands it over. Scalars stay untyped so `date: 2024` reads the same as `date: "2024"`.
#[derive(Debug, Default, Deserialize)]
struct RawFrontmatter {
	title: Option<serde_yaml::Value>,
	date: Option<serde_yaml::Value>,
	pages: Option<Vec<serde_yaml::Value>>,
	cover: Option<serde_yaml::Value>,
}

pub fn record_path(content_dir: &Path, id: &str) -> PathBuf {
	content_dir.join(format!("{id}.md"))
}

pub fn read_record(content_dir: &Path, id: &str) -> CoverResult<ComicRecord> {
	if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
		return Err(CoverError::InvalidId(id.to_owned()));
	}

	let path = record_path(content_dir, id);
	let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
		ErrorKind::NotFound => CoverError::NotFound { path: path.clone() },
		_ => CoverError::Io(e),
	})?;

	let fm = match parse_frontmatter(&content) {
		Ok(fm) => fm,
		Err(ParseFailure::MissingHeader) => return Err(CoverError::MalformedRecord { path }),
		Err(ParseFailure::MissingField(field)) => return Err(CoverError::IncompleteRecord { path, field }),
	};

	let record_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
	let record = ComicRecord {
		id: id.to_owned(),
		title: fm.title,
		date: fm.date,
		pages: fm.pages.iter().map(|p| record_dir.join(p)).collect(),
		cover: fm.cover.map(|c| record_dir.join(c)),
	};
	debug!(path = %path.display(), pages = record.pages.len(), "parsed comic record");
	Ok(record)
}

/// Parses the `---` fenced YAML header at the top of `content`. Anything after the closing fence is ignored.
pub fn parse_frontmatter(content: &str) -> Result<Frontmatter, ParseFailure> {
	let mut lines = content.lines().map(|l| l.strip_suffix('\r').unwrap_or(l));
	if lines.next() != Some("---") {
		return Err(ParseFailure::MissingHeader);
	}

	let mut header = Vec::new();
	let mut closed = false;
	for line in lines {
		if line == "---" {
			closed = true;
			break;
		}
		header.push(line);
	}
	if !closed {
		return Err(ParseFailure::MissingHeader);
	}

	let yaml = header.join("\n");
	let raw: RawFrontmatter = if yaml.trim().is_empty() {
		RawFrontmatter::default()
	} else {
		serde_yaml::from_str(&yaml).map_err(|e| {
			debug!(error = %e, "frontmatter is not valid YAML");
			ParseFailure::MissingHeader
		})?
	};

	let title = raw.title.and_then(scalar).ok_or(ParseFailure::MissingField("title"))?;
	let date = raw.date.and_then(scalar).ok_or(ParseFailure::MissingField("date"))?;
	let pages: Vec<String> = raw.pages.unwrap_or_default().into_iter().filter_map(scalar).collect();
	if pages.is_empty() {
		return Err(ParseFailure::MissingField("pages"));
	}
	Ok(Frontmatter {
		title,
		date,
		pages,
		cover: raw.cover.and_then(scalar),
	})
}

/// Non-empty text of a string, number or boolean.
fn scalar(value: serde_yaml::Value) -> Option<String> {
	let text = match value {
		serde_yaml::Value::String(s) => s,
		serde_yaml::Value::Number(n) => n.to_string(),
		serde_yaml::Value::Bool(b) => b.to_string(),
		_ => return None,
	};
	let text = text.trim();
	(!text.is_empty()).then(|| text.to_owned())
}
