use std::fmt::Display;
use std::str::FromStr;

use logos::Logos;

use crate::DocCommentBuffer;
use crate::Point;
use crate::SoyError;
use crate::SoyResult;
use crate::tokens::Symbol;
use crate::tokens::TokenKind;
use crate::tokens::TokenValue;

/// Raw tokens for template text outside of any tag.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum TextToken {
	#[token("{")]
	Open,
	#[token("{{")]
	DoubleOpen,
	#[token("{/")]
	CloseOpen,
	#[token("{{/")]
	DoubleCloseOpen,
	#[token("}")]
	Close,
	#[token("/*")]
	CommentOpen,
	#[token("/**")]
	DocCommentOpen,
	#[regex(r"//[^\n]*", allow_greedy = true)]
	LineComment,
	#[token("/")]
	Slash,
	#[regex(r"[ \t\r\n\f]+")]
	Whitespace,
	#[regex(r"[^{}/ \t\r\n\f]+")]
	Text,
}

/// Raw tokens inside tags: command words, expressions and directives.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum ExprToken {
	#[regex(r"[ \t\r\n\f]+")]
	Whitespace,
	#[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
	Word,
	#[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*")]
	Variable,
	#[regex(r"[0-9]+")]
	Decimal,
	#[regex(r"0[xX][0-9a-fA-F]+")]
	Hex,
	#[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
	Float,
	#[token("==")]
	EqEq,
	#[token("!=")]
	NotEq,
	#[token("<=")]
	LtEq,
	#[token(">=")]
	GtEq,
	#[token("<")]
	Lt,
	#[token(">")]
	Gt,
	#[token("+")]
	Plus,
	#[token("-")]
	Minus,
	#[token("*")]
	Mult,
	#[token("/")]
	Div,
	#[token("%")]
	Mod,
	#[token("?:")]
	Elvis,
	#[token("?.")]
	QuestionDot,
	#[token("?")]
	Question,
	#[token(":")]
	Colon,
	#[token(",")]
	Comma,
	#[token("(")]
	LParen,
	#[token(")")]
	RParen,
	#[token("[")]
	LBrack,
	#[token("]")]
	RBrack,
	#[token(".")]
	Dot,
	#[token("=")]
	Eq,
	#[token("|")]
	Pipe,
	#[token("'")]
	SingleQuote,
	#[token("\"")]
	DoubleQuote,
	#[token("{")]
	LBrace,
	#[token("}")]
	RBrace,
	#[token("/}")]
	SlashRBrace,
}

/// Raw tokens for the name following `namespace`, `template`, `call`, etc.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum NameToken {
	#[regex(r"[ \t\r\n\f]+")]
	Whitespace,
	#[regex(r"\.?[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*")]
	Dotted,
	#[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*")]
	Variable,
}

/// Raw tokens for `key="value"` attribute lists.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum AttributeToken {
	#[regex(r"[ \t\r\n\f]+")]
	Whitespace,
	#[regex(r"[a-zA-Z_][a-zA-Z0-9_\-]*")]
	Word,
	#[token("=")]
	Eq,
	#[token(":")]
	Colon,
	#[token("'")]
	SingleQuote,
	#[token("\"")]
	DoubleQuote,
	#[token("{")]
	LBrace,
	#[token("}")]
	RBrace,
	#[token("/}")]
	SlashRBrace,
}

/// Raw tokens inside a quoted string that is known to terminate on its line.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum StringToken {
	#[regex(r#"[^'"\\\n$]+"#)]
	Chars,
	#[regex(r"\\.")]
	Escape,
	#[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*")]
	Variable,
	#[token("$")]
	Dollar,
	#[token("'")]
	SingleQuote,
	#[token("\"")]
	DoubleQuote,
}

/// Raw tokens inside a `/** ... */` doc comment.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum DocToken {
	#[regex(r"[ \t\r\n\f]+")]
	Whitespace,
	#[token("*/")]
	End,
	#[regex(r"@[a-zA-Z]+\??")]
	AtWord,
	#[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
	Word,
	#[token("*")]
	Star,
	#[token("@")]
	At,
	#[regex(r"[^ \t\r\n\f*@a-zA-Z_]+")]
	Other,
}

/// The lexical context the scanner is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LexMode {
	/// Template text between tags.
	#[default]
	TemplateText,
	/// Right after `{` or `{/`, expecting a command word.
	TagCommand,
	/// Expression inside a tag.
	Expression,
	/// The name after `namespace`, `template`, `call`, `param`, `let`, ...
	Name,
	/// `key="value"` pairs inside a tag.
	Attributes,
	/// After `|`, expecting a print directive name.
	Directive,
	StringLiteral,
	DocComment,
	/// Raw content of a `{literal}` block.
	Literal,
}

impl LexMode {
	pub const ALL: [LexMode; 9] = [
		LexMode::TemplateText,
		LexMode::TagCommand,
		LexMode::Expression,
		LexMode::Name,
		LexMode::Attributes,
		LexMode::Directive,
		LexMode::StringLiteral,
		LexMode::DocComment,
		LexMode::Literal,
	];

	pub const fn name(self) -> &'static str {
		match self {
			LexMode::TemplateText => "template_text",
			LexMode::TagCommand => "tag_command",
			LexMode::Expression => "expression",
			LexMode::Name => "name",
			LexMode::Attributes => "attributes",
			LexMode::Directive => "directive",
			LexMode::StringLiteral => "string_literal",
			LexMode::DocComment => "doc_comment",
			LexMode::Literal => "literal",
		}
	}
}

impl Display for LexMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for LexMode {
	type Err = SoyError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		LexMode::ALL
			.into_iter()
			.find(|mode| mode.name() == value)
			.ok_or_else(|| SoyError::UnknownLexMode(value.to_string()))
	}
}

/// Everything the scanner needs to resume from a given offset.
#[derive(Debug, Clone)]
struct ScanState {
	mode: LexMode,
	/// Modes to return to when the current tag or string closes.
	resume: Vec<LexMode>,
	/// The command word of the open tag.
	command: Option<TokenKind>,
	closing_tag: bool,
	double_brace: bool,
	in_directive: bool,
	/// Quote char that ends the open string.
	string_terminator: char,
	/// The open string is an attribute value.
	attribute_string: bool,
	namespace: Option<String>,
	template: Option<String>,
	tag_start_line: usize,
	doc: DocCommentBuffer,
	/// A doc comment was seen and not yet handed out by a closing template
	/// tag.
	doc_active: bool,
}

impl ScanState {
	fn new(mode: LexMode) -> Self {
		Self {
			mode,
			resume: vec![],
			command: None,
			closing_tag: false,
			double_brace: false,
			in_directive: false,
			string_terminator: '"',
			attribute_string: false,
			namespace: None,
			template: None,
			tag_start_line: 0,
			doc: DocCommentBuffer::new(),
			doc_active: false,
		}
	}

	fn end_tag(&mut self) {
		self.command = None;
		self.closing_tag = false;
		self.double_brace = false;
		self.in_directive = false;
	}
}

/// A saved scanner location. Restoring it resumes scanning exactly where
/// it was taken.
#[derive(Debug, Clone)]
pub struct ScannerPosition<'a> {
	cursor: Point,
	state: ScanState,
	token: Option<Symbol<'a>>,
}

impl ScannerPosition<'_> {
	pub fn offset(&self) -> usize {
		self.cursor.offset
	}

	pub fn mode(&self) -> LexMode {
		self.state.mode
	}
}

/// Pull-based scanner for Closure Templates source.
///
/// Bind it to a buffer with [`SoyScanner::reset`] and call
/// [`SoyScanner::advance`] until it yields [`TokenKind::Eof`]. Malformed
/// input never stops the scan, it is reported through error kinds such as
/// [`TokenKind::UnterminatedStringLiteral`].
#[derive(Debug, Clone)]
pub struct SoyScanner<'a> {
	source: &'a str,
	start: usize,
	end: usize,
	cursor: Point,
	state: ScanState,
	token: Option<Symbol<'a>>,
}

impl Default for SoyScanner<'_> {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> SoyScanner<'a> {
	/// A scanner bound to an empty buffer.
	pub fn new() -> Self {
		Self {
			source: "",
			start: 0,
			end: 0,
			cursor: Point::start_of(0),
			state: ScanState::new(LexMode::TemplateText),
			token: None,
		}
	}

	/// Rebind to `source[start..end]` in `mode`, dropping all state from
	/// the previous scan.
	pub fn reset(&mut self, source: &'a str, start: usize, end: usize, mode: LexMode) -> SoyResult<()> {
		let valid = start <= end
			&& end <= source.len()
			&& source.is_char_boundary(start)
			&& source.is_char_boundary(end);

		if !valid {
			return Err(SoyError::InvalidRange {
				start,
				end,
				len: source.len(),
			});
		}

		tracing::debug!(start, end, %mode, "reset scanner");

		self.source = source;
		self.start = start;
		self.end = end;
		self.cursor = Point::start_of(start);
		self.state = ScanState::new(mode);
		self.token = None;

		Ok(())
	}

	/// Scan the next token. At the end of the range this keeps returning
	/// the same `EOF` token.
	pub fn advance(&mut self) -> &Symbol<'a> {
		let symbol = self.next_symbol();
		tracing::trace!(kind = %symbol.kind, start = symbol.start, end = symbol.end, "scanned");
		self.token.insert(symbol)
	}

	pub fn token(&self) -> Option<&Symbol<'a>> {
		self.token.as_ref()
	}

	pub fn token_kind(&self) -> Option<TokenKind> {
		self.token.as_ref().map(|token| token.kind)
	}

	pub fn token_start(&self) -> usize {
		self.token.as_ref().map_or(self.start, |token| token.start)
	}

	pub fn token_end(&self) -> usize {
		self.token.as_ref().map_or(self.start, |token| token.end)
	}

	pub fn token_text(&self) -> &'a str {
		self.token.as_ref().map_or("", |token| token.text)
	}

	pub fn mode(&self) -> LexMode {
		self.state.mode
	}

	pub fn buffer(&self) -> &'a str {
		self.source
	}

	pub fn buffer_end(&self) -> usize {
		self.end
	}

	/// The line of the `{` that opened the current or last tag.
	pub fn tag_start_line(&self) -> usize {
		self.state.tag_start_line
	}

	pub fn current_namespace(&self) -> Option<&str> {
		self.state.namespace.as_deref()
	}

	pub fn current_template(&self) -> Option<&str> {
		self.state.template.as_deref()
	}

	pub fn position(&self) -> ScannerPosition<'a> {
		ScannerPosition {
			cursor: self.cursor,
			state: self.state.clone(),
			token: self.token.clone(),
		}
	}

	pub fn restore(&mut self, position: ScannerPosition<'a>) {
		self.cursor = position.cursor;
		self.state = position.state;
		self.token = position.token;
	}

	fn next_symbol(&mut self) -> Symbol<'a> {
		loop {
			if self.cursor.offset >= self.end {
				return self.eof();
			}

			let symbol = match self.state.mode {
				LexMode::TemplateText => Some(self.scan_template_text()),
				LexMode::TagCommand => self.scan_tag_command(),
				LexMode::Expression => Some(self.scan_expression()),
				LexMode::Name => self.scan_name(),
				LexMode::Attributes => Some(self.scan_attributes()),
				LexMode::Directive => self.scan_directive(),
				LexMode::StringLiteral => Some(self.scan_string()),
				LexMode::DocComment => Some(self.scan_doc_comment()),
				LexMode::Literal => self.scan_literal(),
			};

			// `None` means the mode changed without consuming input.
			if let Some(symbol) = symbol {
				return symbol;
			}
		}
	}

	fn rest(&self) -> &'a str {
		let source = self.source;
		&source[self.cursor.offset..self.end]
	}

	fn char_at(&self, offset: usize) -> Option<char> {
		let source = self.source;
		source.get(offset..self.end)?.chars().next()
	}

	/// Lex a single raw token of type `T` at the cursor, returning it with
	/// its byte length.
	fn peek<T>(&self) -> Option<(Result<T, T::Error>, usize)>
	where
		T: Logos<'a, Source = str>,
		T::Extras: Default,
	{
		let mut lexer = T::lexer(self.rest());
		let token = lexer.next()?;
		Some((token, lexer.span().end))
	}

	fn emit(&mut self, kind: TokenKind, len: usize) -> Symbol<'a> {
		self.emit_with(kind, len, None)
	}

	fn emit_with(&mut self, kind: TokenKind, len: usize, value: Option<TokenValue>) -> Symbol<'a> {
		let source = self.source;
		let start = self.cursor;
		let end = start.offset + len;
		let text = &source[start.offset..end];
		self.cursor.advance_str(text);

		Symbol {
			kind,
			text,
			start: start.offset,
			end,
			line: start.line,
			column: start.column,
			value,
		}
	}

	fn eof(&self) -> Symbol<'a> {
		Symbol {
			kind: TokenKind::Eof,
			text: "",
			start: self.end,
			end: self.end,
			line: self.cursor.line,
			column: self.cursor.column,
			value: None,
		}
	}

	fn bad_character(&mut self) -> Symbol<'a> {
		let len = self.rest().chars().next().map_or(1, char::len_utf8);
		self.emit(TokenKind::BadCharacter, len)
	}

	fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
		let source = self.source;
		source
			.get(from..self.end)?
			.find(needle)
			.map(|index| index + from)
	}

	/// Length of the rest of the current line, excluding the newline.
	fn line_remainder(&self) -> usize {
		let rest = self.rest();
		rest.find('\n').unwrap_or(rest.len())
	}

	fn scan_template_text(&mut self) -> Symbol<'a> {
		let Some((token, len)) = self.peek::<TextToken>() else {
			return self.eof();
		};

		match token {
			Ok(TextToken::Open) => self.open_tag(false, false, len),
			Ok(TextToken::DoubleOpen) => self.open_tag(true, false, len),
			Ok(TextToken::CloseOpen) => self.open_tag(false, true, len),
			Ok(TextToken::DoubleCloseOpen) => self.open_tag(true, true, len),
			Ok(TextToken::Close) => self.emit(TokenKind::RbraceError, len),
			Ok(TextToken::CommentOpen) => self.block_comment(),
			Ok(TextToken::DocCommentOpen) => self.open_doc_comment(len),
			Ok(TextToken::LineComment) => {
				let source = self.source;
				let preceded_by_space = source[self.start..self.cursor.offset]
					.chars()
					.next_back()
					.is_none_or(char::is_whitespace);

				if preceded_by_space {
					self.emit(TokenKind::LineComment, len)
				} else {
					self.emit(TokenKind::TemplateText, 2)
				}
			}
			Ok(TextToken::Whitespace) => self.emit(TokenKind::Whitespace, len),
			Ok(TextToken::Slash | TextToken::Text) => self.emit(TokenKind::TemplateText, len),
			Err(_) => self.bad_character(),
		}
	}

	fn open_tag(&mut self, double_brace: bool, closing_tag: bool, len: usize) -> Symbol<'a> {
		self.state.resume.push(self.state.mode);
		self.state.mode = LexMode::TagCommand;
		self.state.end_tag();
		self.state.closing_tag = closing_tag;
		self.state.double_brace = double_brace;
		self.state.tag_start_line = self.cursor.line;

		let kind = if closing_tag {
			TokenKind::TagEndLbrace
		} else {
			TokenKind::TagLbrace
		};
		self.emit(kind, len)
	}

	/// `}` or `/}` inside a tag. Double-brace tags need `}}`; a lone `}`
	/// inside them is an ordinary brace.
	fn close_brace(&mut self, self_closing: bool) -> Symbol<'a> {
		let (kind, width) = if self_closing {
			(TokenKind::TagEndRbrace, 2)
		} else {
			(TokenKind::TagRbrace, 1)
		};

		if self.state.double_brace {
			if self.char_at(self.cursor.offset + width) == Some('}') {
				return self.close_tag(kind, width + 1);
			}

			return if self_closing {
				self.emit(TokenKind::Div, 1)
			} else {
				self.emit(TokenKind::RBrace, 1)
			};
		}

		self.close_tag(kind, width)
	}

	fn close_tag(&mut self, kind: TokenKind, len: usize) -> Symbol<'a> {
		let opens_literal = self.state.command == Some(TokenKind::Literal)
			&& !self.state.closing_tag
			&& kind == TokenKind::TagRbrace;
		let after = self.state.resume.pop().unwrap_or_default();

		self.state.mode = if opens_literal { LexMode::Literal } else { after };
		self.state.end_tag();
		self.emit(kind, len)
	}

	/// A `{` inside a single-brace tag: the open tag was never closed, so a
	/// new one starts here.
	fn reopen_tag(&mut self) -> Symbol<'a> {
		self.state.mode = LexMode::TagCommand;
		self.state.end_tag();
		self.state.tag_start_line = self.cursor.line;
		self.emit(TokenKind::UnterminatedTag, 1)
	}

	fn block_comment(&mut self) -> Symbol<'a> {
		match self.find_from(self.cursor.offset + 2, "*/") {
			Some(close) => {
				let len = close + 2 - self.cursor.offset;
				self.emit(TokenKind::Comment, len)
			}
			None => self.emit(TokenKind::UnterminatedComment, self.end - self.cursor.offset),
		}
	}

	fn open_doc_comment(&mut self, len: usize) -> Symbol<'a> {
		// `/**/` is an empty block comment.
		if self.char_at(self.cursor.offset + len) == Some('/') {
			return self.emit(TokenKind::Comment, len + 1);
		}

		if self.find_from(self.cursor.offset + len, "*/").is_none() {
			return self.emit(TokenKind::UnterminatedComment, self.end - self.cursor.offset);
		}

		self.state.doc.reset();
		self.state.doc_active = true;
		self.state.resume.push(self.state.mode);
		self.state.mode = LexMode::DocComment;
		self.emit(TokenKind::DocCommentBegin, len)
	}

	fn scan_doc_comment(&mut self) -> Symbol<'a> {
		let Some((token, len)) = self.peek::<DocToken>() else {
			return self.eof();
		};

		let text = &self.rest()[..len];
		let anticipating =
			matches!(token, Ok(DocToken::Word)) && self.state.doc.anticipating_parameter_name();
		let kind = match token {
			Ok(DocToken::End) => {
				self.state.doc.close();
				let snapshot = Box::new(self.state.doc.clone());
				self.state.mode = self.state.resume.pop().unwrap_or_default();
				return self.emit_with(TokenKind::DocCommentEnd, len, Some(TokenValue::DocComment(snapshot)));
			}
			Ok(DocToken::Whitespace) => TokenKind::DocCommentWhitespace,
			Ok(DocToken::AtWord) if matches!(text, "@param" | "@param?") => TokenKind::DocCommentParamTag,
			Ok(DocToken::AtWord) => TokenKind::DocCommentTag,
			Ok(DocToken::Word) if anticipating => TokenKind::DocCommentIdentifier,
			Ok(DocToken::Word | DocToken::Star | DocToken::At | DocToken::Other) => TokenKind::DocCommentText,
			Err(_) => {
				let symbol = self.bad_character();
				self.state.doc.append(symbol.text);
				return symbol;
			}
		};

		self.state.doc.append(text);
		self.emit(kind, len)
	}

	fn scan_literal(&mut self) -> Option<Symbol<'a>> {
		match self.find_from(self.cursor.offset, "{/literal}") {
			Some(close) if close == self.cursor.offset => {
				self.state.mode = LexMode::TemplateText;
				None
			}
			Some(close) => {
				self.state.mode = LexMode::TemplateText;
				Some(self.emit(TokenKind::LiteralText, close - self.cursor.offset))
			}
			None => {
				let len = self.end - self.cursor.offset;
				Some(self.emit(TokenKind::UnterminatedLiteral, len))
			}
		}
	}

	fn scan_tag_command(&mut self) -> Option<Symbol<'a>> {
		let closing_tag = self.state.closing_tag;

		if let Some((Ok(ExprToken::Word), len)) = self.peek::<ExprToken>() {
			let word = &self.rest()[..len];

			return match (TokenKind::command(word), closing_tag) {
				(Some(kind), true) => {
					self.state.command = Some(kind);
					self.state.mode = LexMode::Attributes;
					let value = self.take_finished_doc_comment(kind);
					Some(self.emit_with(kind, len, value))
				}
				(None, true) => {
					self.state.mode = LexMode::Attributes;
					Some(self.emit(TokenKind::IllegalCloseTag, len))
				}
				(Some(kind), false) => {
					self.state.command = Some(kind);
					self.state.mode = follow_mode(kind);
					Some(self.emit(kind, len))
				}
				(None, false) => {
					// Implicit `print`.
					self.state.mode = LexMode::Expression;
					None
				}
			};
		}

		let rest = self.rest();
		if !closing_tag && matches!(rest.get(..2), Some("\\n" | "\\r" | "\\t")) {
			self.state.command = Some(TokenKind::SpecialChar);
			self.state.mode = LexMode::Attributes;
			return Some(self.emit(TokenKind::SpecialChar, 2));
		}

		self.state.mode = if closing_tag {
			LexMode::Attributes
		} else {
			LexMode::Expression
		};
		None
	}

	/// Closing `{/template}` hands out the doc comment of the template.
	fn take_finished_doc_comment(&mut self, kind: TokenKind) -> Option<TokenValue> {
		if !matches!(kind, TokenKind::Template | TokenKind::Deltemplate) {
			return None;
		}

		self.state.template = None;
		if !self.state.doc_active {
			return None;
		}

		self.state.doc_active = false;
		let snapshot = self.state.doc.close_clone_and_reset();
		Some(TokenValue::DocComment(Box::new(snapshot)))
	}

	fn scan_name(&mut self) -> Option<Symbol<'a>> {
		let Some((token, len)) = self.peek::<NameToken>() else {
			self.state.mode = LexMode::Attributes;
			return None;
		};
		let command = self.state.command;
		let text = &self.rest()[..len];

		let kind = match (token, command) {
			(Ok(NameToken::Whitespace), _) => return Some(self.emit(TokenKind::Whitespace, len)),
			(Ok(NameToken::Dotted), Some(TokenKind::Namespace)) => {
				self.state.namespace = Some(text.to_string());
				self.state.doc.set_namespace(text);
				TokenKind::NamespaceIdentifier
			}
			(Ok(NameToken::Dotted), Some(TokenKind::Alias)) => TokenKind::NamespaceIdentifier,
			(Ok(NameToken::Dotted), Some(TokenKind::Delpackage)) => TokenKind::PackageIdentifier,
			(Ok(NameToken::Dotted), Some(TokenKind::Template)) => {
				self.declare_template(text);
				TokenKind::TemplateIdentifier
			}
			(Ok(NameToken::Dotted), Some(TokenKind::Deltemplate)) => {
				self.declare_template(text);
				TokenKind::DeltemplateIdentifier
			}
			(Ok(NameToken::Dotted), Some(TokenKind::Call)) => TokenKind::TemplateIdentifier,
			(Ok(NameToken::Dotted), Some(TokenKind::Delcall)) => TokenKind::DeltemplateIdentifier,
			(Ok(NameToken::Dotted), Some(TokenKind::Param)) => TokenKind::InnerParameterDef,
			(Ok(NameToken::Variable), Some(TokenKind::Let)) => TokenKind::LetIdentifier,
			_ => {
				self.state.mode = LexMode::Attributes;
				return None;
			}
		};

		self.state.mode = LexMode::Attributes;
		Some(self.emit(kind, len))
	}

	fn declare_template(&mut self, name: &str) {
		self.state.template = Some(name.to_string());

		if self.state.doc_active {
			self.state.doc.set_template_name(name);
			self.state.doc.set_template_declaration_line(self.cursor.line);
		}
	}

	fn scan_attributes(&mut self) -> Symbol<'a> {
		let Some((token, len)) = self.peek::<AttributeToken>() else {
			return self.eof();
		};

		match token {
			Ok(AttributeToken::Whitespace) => self.emit(TokenKind::Whitespace, len),
			Ok(AttributeToken::Word) => self.emit(TokenKind::CapturedIdentifier, len),
			Ok(AttributeToken::Eq) => self.emit(TokenKind::Eq, len),
			Ok(AttributeToken::Colon)
				if matches!(self.state.command, Some(TokenKind::Param | TokenKind::Let)) =>
			{
				self.state.mode = LexMode::Expression;
				self.emit(TokenKind::Colon, len)
			}
			Ok(AttributeToken::SingleQuote) => self.open_string('\'', true),
			Ok(AttributeToken::DoubleQuote) => self.open_string('"', true),
			Ok(AttributeToken::LBrace) if self.state.double_brace => self.emit(TokenKind::LBrace, len),
			Ok(AttributeToken::LBrace) => self.reopen_tag(),
			Ok(AttributeToken::RBrace) => self.close_brace(false),
			Ok(AttributeToken::SlashRBrace) => self.close_brace(true),
			Ok(AttributeToken::Colon) | Err(_) => self.bad_character(),
		}
	}

	fn scan_directive(&mut self) -> Option<Symbol<'a>> {
		match self.peek::<ExprToken>() {
			Some((Ok(ExprToken::Whitespace), len)) => Some(self.emit(TokenKind::Whitespace, len)),
			Some((Ok(ExprToken::Word), len)) => {
				self.state.mode = LexMode::Expression;
				Some(self.emit(TokenKind::DirectiveIdentifier, len))
			}
			_ => {
				self.state.mode = LexMode::Expression;
				None
			}
		}
	}

	fn scan_expression(&mut self) -> Symbol<'a> {
		let Some((token, len)) = self.peek::<ExprToken>() else {
			return self.eof();
		};

		let text = &self.rest()[..len];
		let kind = match token {
			Ok(ExprToken::Whitespace) => TokenKind::Whitespace,
			Ok(ExprToken::Word) => {
				if let Some(keyword) = TokenKind::keyword(text) {
					let value = (keyword == TokenKind::BooleanLiteral)
						.then(|| TokenValue::Boolean(text == "true"));
					return self.emit_with(keyword, len, value);
				}

				if self.char_at(self.cursor.offset + len) == Some('(') {
					TokenKind::CapturedFunctionIdentifier
				} else {
					TokenKind::CapturedIdentifier
				}
			}
			Ok(ExprToken::Variable) => {
				if self.state.doc_active && self.state.template.is_some() {
					self.state.doc.parameter_used(&text[1..]);
				}
				TokenKind::ParameterRef
			}
			Ok(ExprToken::Decimal) => return self.integer(text, 10),
			Ok(ExprToken::Hex) => return self.integer(&text[2..], 16),
			Ok(ExprToken::Float) => {
				let value = text.parse::<f64>().ok().map(TokenValue::Float);
				return self.emit_with(TokenKind::FloatingPointLiteral, len, value);
			}
			Ok(ExprToken::EqEq) => TokenKind::EqEq,
			Ok(ExprToken::NotEq) => TokenKind::NotEq,
			Ok(ExprToken::LtEq) => TokenKind::LtEq,
			Ok(ExprToken::GtEq) => TokenKind::GtEq,
			Ok(ExprToken::Lt) => TokenKind::Lt,
			Ok(ExprToken::Gt) => TokenKind::Gt,
			Ok(ExprToken::Plus) => TokenKind::Plus,
			Ok(ExprToken::Minus) => TokenKind::Minus,
			Ok(ExprToken::Mult) => TokenKind::Mult,
			Ok(ExprToken::Div) => TokenKind::Div,
			Ok(ExprToken::Mod) => TokenKind::Mod,
			Ok(ExprToken::Elvis) => TokenKind::Elvis,
			Ok(ExprToken::QuestionDot) => TokenKind::QuestionDot,
			Ok(ExprToken::Question) => TokenKind::Question,
			Ok(ExprToken::Colon) if self.state.in_directive => TokenKind::DirectiveColon,
			Ok(ExprToken::Colon) => TokenKind::Colon,
			Ok(ExprToken::Comma) if self.state.in_directive => TokenKind::DirectiveComma,
			Ok(ExprToken::Comma) => TokenKind::Comma,
			Ok(ExprToken::LParen) => TokenKind::LParen,
			Ok(ExprToken::RParen) => TokenKind::RParen,
			Ok(ExprToken::LBrack) => TokenKind::LBrack,
			Ok(ExprToken::RBrack) => TokenKind::RBrack,
			Ok(ExprToken::Dot) => TokenKind::Dot,
			Ok(ExprToken::Eq) => TokenKind::Eq,
			Ok(ExprToken::Pipe) => {
				self.state.in_directive = true;
				self.state.mode = LexMode::Directive;
				TokenKind::DirectivePipe
			}
			Ok(ExprToken::SingleQuote) => return self.open_string('\'', false),
			Ok(ExprToken::DoubleQuote) => return self.open_string('"', false),
			Ok(ExprToken::LBrace) if self.state.double_brace => TokenKind::LBrace,
			Ok(ExprToken::LBrace) => return self.reopen_tag(),
			Ok(ExprToken::RBrace) => return self.close_brace(false),
			Ok(ExprToken::SlashRBrace) => return self.close_brace(true),
			Err(_) => return self.bad_character(),
		};

		self.emit(kind, len)
	}

	fn integer(&mut self, digits: &str, radix: u32) -> Symbol<'a> {
		let len = if radix == 16 {
			digits.len() + 2
		} else {
			digits.len()
		};

		match parse_long(digits, radix) {
			Some(value) => self.emit_with(TokenKind::IntegerLiteral, len, Some(TokenValue::Integer(value))),
			None => self.emit(TokenKind::InvalidIntegerLiteral, len),
		}
	}

	/// Enter a string at the quote under the cursor, or swallow the rest of
	/// the line as an unterminated string when no closing quote follows.
	fn open_string(&mut self, terminator: char, attribute_string: bool) -> Symbol<'a> {
		if !self.string_terminates(terminator) {
			let len = self.line_remainder();
			return self.emit(TokenKind::UnterminatedStringLiteral, len);
		}

		self.state.resume.push(self.state.mode);
		self.state.mode = LexMode::StringLiteral;
		self.state.string_terminator = terminator;
		self.state.attribute_string = attribute_string;
		self.emit(TokenKind::StringLiteralBegin, 1)
	}

	fn string_terminates(&self, terminator: char) -> bool {
		let mut chars = self.rest().chars().skip(1);

		while let Some(ch) = chars.next() {
			match ch {
				'\\' => {
					if matches!(chars.next(), None | Some('\n')) {
						return false;
					}
				}
				'\n' => return false,
				ch if ch == terminator => return true,
				_ => {}
			}
		}

		false
	}

	fn scan_string(&mut self) -> Symbol<'a> {
		let Some((token, len)) = self.peek::<StringToken>() else {
			return self.eof();
		};

		let text = &self.rest()[..len];
		match token {
			Ok(StringToken::SingleQuote) if self.state.string_terminator == '\'' => self.close_string(len),
			Ok(StringToken::DoubleQuote) if self.state.string_terminator == '"' => self.close_string(len),
			Ok(StringToken::Variable) if self.state.attribute_string => {
				self.emit(TokenKind::StringParameterRef, len)
			}
			Ok(StringToken::Escape) => self.string_escape(text),
			Ok(
				StringToken::Chars
				| StringToken::Variable
				| StringToken::Dollar
				| StringToken::SingleQuote
				| StringToken::DoubleQuote,
			) => self.emit(TokenKind::StringLiteral, len),
			Err(_) => self.bad_character(),
		}
	}

	fn close_string(&mut self, len: usize) -> Symbol<'a> {
		self.state.mode = self.state.resume.pop().unwrap_or_default();
		self.state.string_terminator = '"';
		self.state.attribute_string = false;
		self.emit(TokenKind::StringLiteralEnd, len)
	}

	fn string_escape(&mut self, text: &str) -> Symbol<'a> {
		let len = text.len();

		match text.as_bytes().get(1) {
			Some(b'n' | b'r' | b't' | b'b' | b'f' | b'\\' | b'\'' | b'"') => {
				self.emit(TokenKind::StringLiteralEscape, len)
			}
			Some(b'u') => {
				let rest = &self.rest()[len..];
				let hex_digits = rest
					.chars()
					.take(4)
					.take_while(char::is_ascii_hexdigit)
					.count();

				if hex_digits == 4 {
					self.emit(TokenKind::StringLiteralEscape, len + 4)
				} else {
					self.emit(TokenKind::BadStringEscape, len)
				}
			}
			_ => self.emit(TokenKind::BadStringEscape, len),
		}
	}
}

/// Where a tag continues after its command word.
fn follow_mode(command: TokenKind) -> LexMode {
	match command {
		TokenKind::Namespace
		| TokenKind::Alias
		| TokenKind::Delpackage
		| TokenKind::Template
		| TokenKind::Deltemplate
		| TokenKind::Call
		| TokenKind::Delcall
		| TokenKind::Param
		| TokenKind::Let => LexMode::Name,
		TokenKind::If
		| TokenKind::ElseIf
		| TokenKind::Switch
		| TokenKind::Case
		| TokenKind::Foreach
		| TokenKind::For
		| TokenKind::Print
		| TokenKind::Css => LexMode::Expression,
		_ => LexMode::Attributes,
	}
}

/// Accumulate a digit run left to right as `result * radix + digit`.
///
/// The digits are expected to be valid for `radix`; `None` is returned for
/// an invalid digit or when the value overflows an `i64`.
pub fn parse_long(digits: &str, radix: u32) -> Option<i64> {
	digits.chars().try_fold(0_i64, |result, ch| {
		let digit = i64::from(ch.to_digit(radix)?);
		result.checked_mul(i64::from(radix))?.checked_add(digit)
	})
}

/// Scan all of `source` from template text, excluding the final `EOF`.
pub fn tokenize(source: &str) -> Vec<Symbol<'_>> {
	let mut scanner = SoyScanner::new();
	// A full-length range on a `&str` is always valid.
	if scanner.reset(source, 0, source.len(), LexMode::TemplateText).is_err() {
		return vec![];
	}

	drain(&mut scanner)
}

/// Scan `source[start..end]` starting in `mode`, excluding the final `EOF`.
pub fn tokenize_range(source: &str, start: usize, end: usize, mode: LexMode) -> SoyResult<Vec<Symbol<'_>>> {
	let mut scanner = SoyScanner::new();
	scanner.reset(source, start, end, mode)?;

	Ok(drain(&mut scanner))
}

fn drain<'a>(scanner: &mut SoyScanner<'a>) -> Vec<Symbol<'a>> {
	let mut symbols = vec![];

	loop {
		let symbol = scanner.advance();
		if symbol.kind == TokenKind::Eof {
			return symbols;
		}

		symbols.push(symbol.clone());
	}
}
