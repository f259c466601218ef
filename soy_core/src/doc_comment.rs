use std::fmt::Display;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

/// Parameter names after `@param`, anchored to the start of the remainder.
static PARAM_NAME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*")
		.unwrap_or_else(|e| panic!("invalid parameter name pattern: {e}"))
});

/// Unflushed content that ends right where a parameter name should start.
static ANTICIPATE_PARAM_NAME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*(\*+\s*)?@param\??\s*$")
		.unwrap_or_else(|e| panic!("invalid @param lookahead pattern: {e}"))
});

const PARAM_MARKER: &str = "@param";

/// The shape a template parameter is used with in the template body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InferredType {
	Scalar,
	Map,
	List,
	Ambiguous,
	#[default]
	Undefined,
}

impl InferredType {
	/// `Undefined` yields the other value, equal values are kept and two
	/// distinct defined values become `Ambiguous`.
	pub fn merge_with(self, other: InferredType) -> InferredType {
		match (self, other) {
			(InferredType::Undefined, other) => other,
			(this, InferredType::Undefined) => this,
			(this, other) if this == other => this,
			_ => InferredType::Ambiguous,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocParameter {
	pub description: String,
	pub optional: bool,
}

/// Which part of the comment the next line belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Section {
	#[default]
	Description,
	Parameter(String),
	/// An `@param` marker without a readable name; lines are dropped until
	/// the next marker.
	Discarded,
}

/// Accumulates one template's `/** ... */` doc comment.
///
/// Text is appended in arbitrary chunks and interpreted a line at a time.
/// The scanner owns one live buffer per scan and hands out snapshots with
/// [`DocCommentBuffer::close_clone_and_reset`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocCommentBuffer {
	namespace: Option<String>,
	template_name: Option<String>,
	template_declaration_line: Option<usize>,
	description: Option<String>,
	parameters: IndexMap<String, DocParameter>,
	usages: IndexMap<String, InferredType>,
	#[serde(skip)]
	section: Section,
	#[serde(skip)]
	pending: String,
	#[serde(skip)]
	captured: Vec<String>,
}

impl DocCommentBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_namespace(namespace: impl Into<String>) -> Self {
		Self {
			namespace: Some(namespace.into()),
			..Self::default()
		}
	}

	/// Build a closed buffer from a complete comment.
	pub fn from_text(namespace: Option<&str>, text: &str) -> Self {
		let mut buffer = Self {
			namespace: namespace.map(ToString::to_string),
			..Self::default()
		};
		buffer.append(text);
		buffer.close();
		buffer
	}

	pub fn set_namespace(&mut self, namespace: impl Into<String>) {
		self.namespace = Some(namespace.into());
	}

	pub fn set_template_name(&mut self, template_name: impl Into<String>) {
		self.template_name = Some(template_name.into());
	}

	pub fn set_template_declaration_line(&mut self, line: usize) {
		self.template_declaration_line = Some(line);
	}

	/// Buffer raw comment text. Nothing is interpreted until a newline is
	/// flushed or the buffer is closed.
	pub fn append(&mut self, text: &str) {
		self.pending.push_str(text);
	}

	/// Interpret every buffered line, including a trailing partial one.
	pub fn close(&mut self) {
		self.flush();

		if !self.pending.is_empty() {
			let line = std::mem::take(&mut self.pending);
			self.process_line(&line);
		}
	}

	/// Close, hand back an independent copy, and empty the live buffer.
	pub fn close_clone_and_reset(&mut self) -> DocCommentBuffer {
		self.close();
		let snapshot = self.clone();
		self.reset();
		snapshot
	}

	/// Forget everything about the current comment. The namespace is kept
	/// since it belongs to the file.
	pub fn reset(&mut self) {
		self.template_name = None;
		self.template_declaration_line = None;
		self.description = None;
		self.parameters.clear();
		self.usages.clear();
		self.section = Section::Description;
		self.pending.clear();
		self.captured.clear();
	}

	/// Whether the text after the last newline is an `@param` marker still
	/// waiting for its name.
	pub fn anticipating_parameter_name(&mut self) -> bool {
		self.flush();
		ANTICIPATE_PARAM_NAME.is_match(&self.pending)
	}

	/// Record a reference to `$name` in the template body.
	pub fn parameter_used(&mut self, name: &str) {
		let usage = self.usages.entry(name.to_string()).or_default();
		*usage = usage.merge_with(InferredType::Ambiguous);
	}

	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	pub fn template_name(&self) -> Option<&str> {
		self.template_name.as_deref()
	}

	pub fn template_declaration_line(&self) -> Option<usize> {
		self.template_declaration_line
	}

	/// `namespace + template name`, with `???` standing in for a template
	/// that was never named.
	pub fn fq_template_name(&self) -> String {
		format!(
			"{}{}",
			self.namespace.as_deref().unwrap_or_default(),
			self.template_name.as_deref().unwrap_or("???")
		)
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref().filter(|text| !text.is_empty())
	}

	/// Declared parameter names in declaration order.
	pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
		self.parameters.keys().map(String::as_str)
	}

	pub fn parameters(&self) -> &IndexMap<String, DocParameter> {
		&self.parameters
	}

	pub fn parameter_description(&self, name: &str) -> Option<&str> {
		self.parameters
			.get(name)
			.map(|parameter| parameter.description.as_str())
	}

	pub fn is_parameter_optional(&self, name: &str) -> Option<bool> {
		self.parameters.get(name).map(|parameter| parameter.optional)
	}

	/// How `name` was used in the body, `Undefined` when never referenced.
	pub fn parameter_usage(&self, name: &str) -> InferredType {
		self.usages.get(name).copied().unwrap_or_default()
	}

	/// The raw lines interpreted so far.
	pub fn captured_text(&self) -> &[String] {
		&self.captured
	}

	fn flush(&mut self) {
		let Some(last_newline) = self.pending.rfind('\n') else {
			return;
		};

		let complete: String = self.pending.drain(..=last_newline).collect();
		for line in complete[..last_newline].split('\n') {
			self.process_line(line);
		}
	}

	fn process_line(&mut self, raw: &str) {
		self.captured.push(raw.to_string());

		let mut line = raw.trim();
		if let Some(rest) = line.strip_prefix("/**") {
			line = rest.trim();
		}
		if let Some(rest) = line.strip_suffix("*/") {
			line = rest.trim();
		}
		if let Some(rest) = line.strip_prefix('*') {
			line = rest.trim();
		}

		if let Some(rest) = param_marker_remainder(line) {
			self.start_parameter(rest);
			return;
		}

		match &self.section {
			Section::Description => {
				let description = self.description.take().unwrap_or_default();
				self.description = Some(join_segments(&description, line));
			}
			Section::Parameter(name) => {
				if let Some(parameter) = self.parameters.get_mut(name) {
					parameter.description = join_segments(&parameter.description, line);
				}
			}
			Section::Discarded => {}
		}
	}

	fn start_parameter(&mut self, rest: &str) {
		let (optional, rest) = match rest.strip_prefix('?') {
			Some(rest) => (true, rest),
			None => (false, rest),
		};
		let rest = rest.trim_start();

		let Some(found) = PARAM_NAME.find(rest) else {
			self.section = Section::Discarded;
			return;
		};

		let name = found.as_str().to_string();
		let parameter = self.parameters.entry(name.clone()).or_default();
		parameter.optional = optional;
		parameter.description = join_segments(&parameter.description, rest[found.end()..].trim());
		self.section = Section::Parameter(name);
	}
}

/// The text after an `@param` marker, if `line` starts with one.
fn param_marker_remainder(line: &str) -> Option<&str> {
	let rest = line.strip_prefix(PARAM_MARKER)?;
	let boundary = rest.is_empty() || rest.starts_with('?') || rest.starts_with(char::is_whitespace);

	boundary.then_some(rest)
}

fn join_segments(existing: &str, line: &str) -> String {
	if existing.is_empty() {
		return line.to_string();
	}

	if line.is_empty() {
		return existing.to_string();
	}

	format!("{existing} {line}").trim().to_string()
}

impl Display for DocCommentBuffer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let names: Vec<&str> = self.parameter_names().collect();
		write!(f, "{}({});", self.fq_template_name(), names.join(","))
	}
}
