use std::collections::VecDeque;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::LexMode;
use crate::ScannerPosition;
use crate::SoyResult;
use crate::SoyScanner;
use crate::tokens::Symbol;
use crate::tokens::TokenKind;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"[a-zA-Z_][a-zA-Z0-9_]*").unwrap_or_else(|e| panic!("invalid identifier pattern: {e}"))
});

/// A slice of a fragmentable token. `range` is relative to the start of
/// the token it was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFragment {
	pub range: Range<usize>,
	pub kind: TokenKind,
}

/// Cut `text` into identifier fragments of `kind`, with every run between
/// them as `IGNORED_TEXT`. The ranges cover `0..text.len()` in order.
pub fn split_words(text: &str, kind: TokenKind) -> Vec<TokenFragment> {
	let mut fragments = vec![];
	let mut cursor = 0;

	for found in IDENTIFIER.find_iter(text) {
		if found.start() > cursor {
			fragments.push(TokenFragment {
				range: cursor..found.start(),
				kind: TokenKind::IgnoredText,
			});
		}

		fragments.push(TokenFragment {
			range: found.range(),
			kind,
		});
		cursor = found.end();
	}

	if cursor < text.len() {
		fragments.push(TokenFragment {
			range: cursor..text.len(),
			kind: TokenKind::IgnoredText,
		});
	}

	fragments
}

/// Wraps [`SoyScanner`] and re-emits dotted names and `$` references one
/// word at a time.
///
/// For `{namespace example.soy}` the scanner produces a single
/// `NAMESPACE_IDENTIFIER`, while this lexer produces `example`, `.` as
/// `IGNORED_TEXT`, and `soy`.
#[derive(Debug, Default)]
pub struct WordScanningLexer<'a> {
	scanner: SoyScanner<'a>,
	/// The scanner token the queued fragments were cut from.
	parent: Option<Symbol<'a>>,
	fragments: VecDeque<TokenFragment>,
	current: Option<Symbol<'a>>,
}

impl<'a> WordScanningLexer<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn start(&mut self, source: &'a str, start: usize, end: usize, mode: LexMode) -> SoyResult<()> {
		self.scanner.reset(source, start, end, mode)?;
		self.clear();

		Ok(())
	}

	/// Move to the next fragment, scanning a new token once the queue is
	/// drained.
	pub fn advance(&mut self) -> &Symbol<'a> {
		if self.fragments.is_empty() {
			let token = self.scanner.advance().clone();
			let fragments = if token.kind.is_fragmentable() {
				split_words(token.text, token.kind)
			} else {
				vec![]
			};

			// Tokens with nothing to split are passed through whole.
			if fragments.is_empty() {
				self.parent = None;
				return self.current.insert(token);
			}

			tracing::trace!(kind = %token.kind, text = token.text, fragments = fragments.len(), "split token");
			self.fragments.extend(fragments);
			self.parent = Some(token);
		}

		let symbol = match (self.fragments.pop_front(), &self.parent) {
			(Some(fragment), Some(parent)) => fragment_symbol(parent, &fragment),
			_ => unreachable!("queued fragments always have a parent token"),
		};

		self.current.insert(symbol)
	}

	pub fn token(&self) -> Option<&Symbol<'a>> {
		self.current.as_ref()
	}

	pub fn token_kind(&self) -> Option<TokenKind> {
		self.current.as_ref().map(|token| token.kind)
	}

	pub fn token_start(&self) -> usize {
		self.current
			.as_ref()
			.map_or_else(|| self.scanner.token_start(), |token| token.start)
	}

	pub fn token_end(&self) -> usize {
		self.current
			.as_ref()
			.map_or_else(|| self.scanner.token_end(), |token| token.end)
	}

	pub fn token_text(&self) -> &'a str {
		self.current.as_ref().map_or("", |token| token.text)
	}

	/// Fragments still queued from the last split.
	pub fn pending_fragments(&self) -> usize {
		self.fragments.len()
	}

	pub fn scanner(&self) -> &SoyScanner<'a> {
		&self.scanner
	}

	/// The position of the wrapped scanner. Fragments are not part of it.
	pub fn position(&self) -> ScannerPosition<'a> {
		self.scanner.position()
	}

	/// Restore the wrapped scanner and drop any queued fragments.
	pub fn restore(&mut self, position: ScannerPosition<'a>) {
		self.scanner.restore(position);
		self.clear();
	}

	fn clear(&mut self) {
		self.fragments.clear();
		self.parent = None;
		self.current = None;
	}
}

fn fragment_symbol<'a>(parent: &Symbol<'a>, fragment: &TokenFragment) -> Symbol<'a> {
	let leading = &parent.text[..fragment.range.start];

	Symbol {
		kind: fragment.kind,
		text: &parent.text[fragment.range.clone()],
		start: parent.start + fragment.range.start,
		end: parent.start + fragment.range.end,
		line: parent.line,
		column: parent.column + leading.chars().count(),
		value: None,
	}
}

/// Scan all of `source` through the word lexer, excluding the final `EOF`.
pub fn tokenize_words(source: &str) -> Vec<Symbol<'_>> {
	let mut lexer = WordScanningLexer::new();
	if lexer.start(source, 0, source.len(), LexMode::TemplateText).is_err() {
		return vec![];
	}

	let mut symbols = vec![];
	loop {
		let symbol = lexer.advance();
		if symbol.kind == TokenKind::Eof {
			return symbols;
		}

		symbols.push(symbol.clone());
	}
}
