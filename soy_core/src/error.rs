use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum SoyError {
	#[error(transparent)]
	#[diagnostic(code(soy::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(soy::config_parse),
		help("check that soy.toml is valid TOML with [lexer], [logging] and/or [inspections] sections")
	)]
	ConfigParse(String),

	#[error("invalid scan range {start}..{end} for a buffer of {len} bytes")]
	#[diagnostic(
		code(soy::invalid_range),
		help("offsets must satisfy start <= end <= len and fall on char boundaries")
	)]
	InvalidRange { start: usize, end: usize, len: usize },

	#[error("unknown lexer mode: `{0}`")]
	#[diagnostic(
		code(soy::unknown_lex_mode),
		help(
			"expected one of: template_text, tag_command, expression, name, attributes, directive, \
			 string_literal, doc_comment, literal"
		)
	)]
	UnknownLexMode(String),

	#[error("unbalanced path `{label}`: {reason}")]
	#[diagnostic(
		code(soy::unbalanced_path),
		help("every `pop` step needs an earlier `push`, and every `push` must be popped")
	)]
	UnbalancedPath { label: String, reason: String },

	#[error("invalid traversal: {0}")]
	#[diagnostic(code(soy::invalid_traversal))]
	InvalidTraversal(String),

	#[error("unknown parent node #{parent} in a tree of {len} nodes")]
	#[diagnostic(
		code(soy::unknown_parent),
		help("parents must be built in the same tree before their children")
	)]
	UnknownParent { parent: usize, len: usize },

	#[error("invalid pattern: {0}")]
	#[diagnostic(code(soy::invalid_pattern))]
	InvalidPattern(String),

	#[error("parser value for `{name}` is already {existing}, refusing to replace it with {proposed}")]
	#[diagnostic(
		code(soy::parser_values_conflict),
		help("parser values can only be imported once per process")
	)]
	ParserValuesConflict {
		name: String,
		existing: i32,
		proposed: i32,
	},
}

impl From<regex::Error> for SoyError {
	fn from(error: regex::Error) -> Self {
		SoyError::InvalidPattern(error.to_string())
	}
}

pub type SoyResult<T> = Result<T, SoyError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
