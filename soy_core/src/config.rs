use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::LexMode;
use crate::SoyError;
use crate::SoyResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["soy.toml", ".soy.toml", ".config/soy.toml"];

/// Project settings read from `soy.toml`.
///
/// ```toml
/// [lexer]
/// initial_mode = "template_text"
/// fragment_words = true
///
/// [logging]
/// filter = "soy_core=debug"
///
/// [inspections]
/// disabled = ["msg-without-description"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SoyConfig {
	pub lexer: LexerConfig,
	pub logging: LoggingConfig,
	pub inspections: InspectionsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LexerConfig {
	/// The mode a scan starts in, by its snake case name.
	pub initial_mode: String,
	/// Split dotted names and `$` references into words when dumping
	/// tokens.
	pub fragment_words: bool,
	/// Leave whitespace and comments out of token dumps.
	pub skip_ignorable: bool,
}

impl Default for LexerConfig {
	fn default() -> Self {
		Self {
			initial_mode: LexMode::TemplateText.name().to_string(),
			fragment_words: true,
			skip_ignorable: false,
		}
	}
}

impl LexerConfig {
	pub fn initial_mode(&self) -> SoyResult<LexMode> {
		self.initial_mode.parse()
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
	/// An `EnvFilter` directive used when neither `--verbose` nor
	/// `RUST_LOG` is set.
	pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InspectionsConfig {
	/// Inspection ids to skip.
	pub disabled: Vec<String>,
}

impl InspectionsConfig {
	pub fn is_enabled(&self, id: &str) -> bool {
		!self.disabled.iter().any(|disabled| disabled == id)
	}
}

impl SoyConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> SoyResult<Option<SoyConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: SoyConfig = toml::from_str(&content).map_err(|e| SoyError::ConfigParse(e.to_string()))?;
		config.lexer.initial_mode()?;

		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}
}
