use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;
use std::sync::PoisonError;
use std::sync::RwLock;

use float_cmp::approx_eq;

use crate::DocCommentBuffer;
use crate::SoyError;
use crate::SoyResult;

macro_rules! token_kinds {
	($($(#[$meta:meta])* $variant:ident => $name:literal,)+) => {
		/// Every terminal the scanner and the word lexer can produce.
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub enum TokenKind {
			$($(#[$meta])* $variant,)+
		}

		impl TokenKind {
			/// All kinds in declaration order.
			pub const ALL: &'static [TokenKind] = &[$(TokenKind::$variant,)+];

			/// The stable grammar name of this kind, e.g. `TAG_LBRACE`.
			pub const fn name(self) -> &'static str {
				match self {
					$(TokenKind::$variant => $name,)+
				}
			}

			/// Look a kind up by its grammar name.
			pub fn from_name(name: &str) -> Option<TokenKind> {
				match name {
					$($name => Some(TokenKind::$variant),)+
					_ => None,
				}
			}
		}
	};
}

token_kinds! {
	/// `{` or `{{` opening a tag.
	TagLbrace => "TAG_LBRACE",
	/// `{/` or `{{/` opening a closing tag.
	TagEndLbrace => "TAG_END_LBRACE",
	/// `}` or `}}` closing a tag.
	TagRbrace => "TAG_RBRACE",
	/// `/}` or `/}}` closing a self-closing tag.
	TagEndRbrace => "TAG_END_RBRACE",
	/// A `}` in template text with no open tag.
	RbraceError => "RBRACE_ERROR",
	/// A `{` inside a tag that was never closed.
	UnterminatedTag => "UNTERMINATED_TAG",
	/// An unknown command word after `{/`.
	IllegalCloseTag => "ILLEGAL_CLOSE_TAG",

	Namespace => "NAMESPACE",
	Alias => "ALIAS",
	Delpackage => "DELPACKAGE",
	Template => "TEMPLATE",
	Deltemplate => "DELTEMPLATE",
	Call => "CALL",
	Delcall => "DELCALL",
	Param => "PARAM",
	Let => "LET",
	If => "IF",
	ElseIf => "ELSE_IF",
	Else => "ELSE",
	Switch => "SWITCH",
	Case => "CASE",
	Default => "DEFAULT",
	Foreach => "FOREACH",
	For => "FOR",
	IfEmpty => "IF_EMPTY",
	Msg => "MSG",
	Print => "PRINT",
	Literal => "LITERAL",
	Css => "CSS",
	/// `{sp}`, `{nil}`, `{lb}`, `{rb}`, `{\n}`, `{\r}` and `{\t}`.
	SpecialChar => "SPECIAL_CHAR",

	NamespaceIdentifier => "NAMESPACE_IDENTIFIER",
	PackageIdentifier => "PACKAGE_IDENTIFIER",
	/// A local (`.foo`) or absolute (`a.b.foo`) template name.
	TemplateIdentifier => "TEMPLATE_IDENTIFIER",
	DeltemplateIdentifier => "DELTEMPLATE_IDENTIFIER",
	/// The name in `{param name: ...}`.
	InnerParameterDef => "INNER_PARAMETER_DEF",
	/// The `$name` in `{let $name: ...}`.
	LetIdentifier => "LET_IDENTIFIER",
	/// `$name` inside an expression.
	ParameterRef => "PARAMETER_REF",
	/// `$name` inside an attribute value.
	StringParameterRef => "STRING_PARAMETER_REF",
	CapturedIdentifier => "CAPTURED_IDENTIFIER",
	CapturedFunctionIdentifier => "CAPTURED_FUNCTION_IDENTIFIER",
	DirectiveIdentifier => "DIRECTIVE_IDENTIFIER",

	Not => "NOT",
	And => "AND",
	Or => "OR",
	In => "IN",
	BooleanLiteral => "BOOLEAN_LITERAL",
	NullLiteral => "NULL_LITERAL",
	IntegerLiteral => "INTEGER_LITERAL",
	FloatingPointLiteral => "FLOATING_POINT_LITERAL",
	/// An integer literal that does not fit an `i64`.
	InvalidIntegerLiteral => "INVALID_INTEGER_LITERAL",

	StringLiteralBegin => "STRING_LITERAL_BEGIN",
	StringLiteral => "STRING_LITERAL",
	StringLiteralEscape => "STRING_LITERAL_ESCAPE",
	StringLiteralEnd => "STRING_LITERAL_END",
	BadStringEscape => "BAD_STRING_ESCAPE",
	/// A quote with no closing quote on the same line, up to the line end.
	UnterminatedStringLiteral => "UNTERMINATED_STRING_LITERAL",

	EqEq => "EQEQ",
	NotEq => "NOTEQ",
	LtEq => "LTEQ",
	GtEq => "GTEQ",
	Lt => "LT",
	Gt => "GT",
	Plus => "PLUS",
	Minus => "MINUS",
	Mult => "MULT",
	Div => "DIV",
	Mod => "MOD",
	/// `?:`
	Elvis => "ELVIS",
	/// `?.`
	QuestionDot => "QUESTION_DOT",
	Question => "QUESTION",
	Colon => "COLON",
	Comma => "COMMA",
	LParen => "LPAREN",
	RParen => "RPAREN",
	LBrack => "LBRACK",
	RBrack => "RBRACK",
	LBrace => "LBRACE",
	RBrace => "RBRACE",
	Dot => "DOT",
	Eq => "EQ",
	DirectivePipe => "DIRECTIVE_PIPE",
	DirectiveColon => "DIRECTIVE_COLON",
	DirectiveComma => "DIRECTIVE_COMMA",

	TemplateText => "TEMPLATE_TEXT",
	LiteralText => "LITERAL_TEXT",
	UnterminatedLiteral => "UNTERMINATED_LITERAL",
	Whitespace => "WHITESPACE",
	/// Gaps between identifier fragments, see [`crate::WordScanningLexer`].
	IgnoredText => "IGNORED_TEXT",
	Comment => "COMMENT",
	LineComment => "LINE_COMMENT",
	UnterminatedComment => "UNTERMINATED_COMMENT",

	DocCommentBegin => "DOC_COMMENT_BEGIN",
	DocCommentText => "DOC_COMMENT",
	DocCommentWhitespace => "DOC_COMMENT_WHITESPACE",
	DocCommentParamTag => "DOC_COMMENT_PARAM_TAG",
	DocCommentTag => "DOC_COMMENT_TAG",
	DocCommentIdentifier => "DOC_COMMENT_IDENTIFIER",
	DocCommentEnd => "DOC_COMMENT_END",

	/// A single char that is not valid where it appears.
	BadCharacter => "BAD_CHARACTER",
	Eof => "EOF",
}

impl TokenKind {
	/// Whitespace and comments that a parser can skip.
	pub const fn is_ignorable(self) -> bool {
		matches!(
			self,
			TokenKind::Whitespace
				| TokenKind::DocCommentWhitespace
				| TokenKind::Comment
				| TokenKind::LineComment
				| TokenKind::IgnoredText
		)
	}

	pub const fn is_identifier_like(self) -> bool {
		matches!(
			self,
			TokenKind::NamespaceIdentifier
				| TokenKind::PackageIdentifier
				| TokenKind::TemplateIdentifier
				| TokenKind::DeltemplateIdentifier
				| TokenKind::InnerParameterDef
				| TokenKind::LetIdentifier
				| TokenKind::ParameterRef
				| TokenKind::StringParameterRef
				| TokenKind::CapturedIdentifier
				| TokenKind::CapturedFunctionIdentifier
				| TokenKind::DirectiveIdentifier
				| TokenKind::DocCommentIdentifier
		)
	}

	/// Kinds the word lexer splits into identifier fragments.
	pub const fn is_fragmentable(self) -> bool {
		matches!(
			self,
			TokenKind::NamespaceIdentifier
				| TokenKind::TemplateIdentifier
				| TokenKind::DeltemplateIdentifier
				| TokenKind::ParameterRef
				| TokenKind::StringParameterRef
		)
	}

	pub const fn is_error(self) -> bool {
		matches!(
			self,
			TokenKind::RbraceError
				| TokenKind::UnterminatedTag
				| TokenKind::IllegalCloseTag
				| TokenKind::InvalidIntegerLiteral
				| TokenKind::BadStringEscape
				| TokenKind::UnterminatedStringLiteral
				| TokenKind::UnterminatedLiteral
				| TokenKind::UnterminatedComment
				| TokenKind::BadCharacter
		)
	}

	pub const fn is_command(self) -> bool {
		matches!(
			self,
			TokenKind::Namespace
				| TokenKind::Alias
				| TokenKind::Delpackage
				| TokenKind::Template
				| TokenKind::Deltemplate
				| TokenKind::Call
				| TokenKind::Delcall
				| TokenKind::Param
				| TokenKind::Let
				| TokenKind::If
				| TokenKind::ElseIf
				| TokenKind::Else
				| TokenKind::Switch
				| TokenKind::Case
				| TokenKind::Default
				| TokenKind::Foreach
				| TokenKind::For
				| TokenKind::IfEmpty
				| TokenKind::Msg
				| TokenKind::Print
				| TokenKind::Literal
				| TokenKind::Css
		)
	}

	pub const fn is_keyword(self) -> bool {
		matches!(
			self,
			TokenKind::Not
				| TokenKind::And
				| TokenKind::Or
				| TokenKind::In
				| TokenKind::BooleanLiteral
				| TokenKind::NullLiteral
		)
	}

	pub const fn is_literal(self) -> bool {
		matches!(
			self,
			TokenKind::BooleanLiteral
				| TokenKind::NullLiteral
				| TokenKind::IntegerLiteral
				| TokenKind::FloatingPointLiteral
				| TokenKind::StringLiteral
		)
	}

	pub const fn is_operator(self) -> bool {
		matches!(
			self,
			TokenKind::EqEq
				| TokenKind::NotEq
				| TokenKind::LtEq
				| TokenKind::GtEq
				| TokenKind::Lt
				| TokenKind::Gt
				| TokenKind::Plus
				| TokenKind::Minus
				| TokenKind::Mult
				| TokenKind::Div
				| TokenKind::Mod
				| TokenKind::Elvis
				| TokenKind::QuestionDot
				| TokenKind::Question
				| TokenKind::Colon
				| TokenKind::Not
				| TokenKind::And
				| TokenKind::Or
		)
	}

	/// The grammar code imported with [`import_parser_values`], if any.
	pub fn parser_value(self) -> Option<i32> {
		PARSER_VALUES
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&self)
			.copied()
	}

	/// Map a word from an expression to its keyword kind.
	pub fn keyword(word: &str) -> Option<TokenKind> {
		let kind = match word {
			"not" => TokenKind::Not,
			"and" => TokenKind::And,
			"or" => TokenKind::Or,
			"in" => TokenKind::In,
			"true" | "false" => TokenKind::BooleanLiteral,
			"null" => TokenKind::NullLiteral,
			_ => return None,
		};

		Some(kind)
	}

	/// Map the first word of a tag to its command kind.
	pub fn command(word: &str) -> Option<TokenKind> {
		let kind = match word {
			"namespace" => TokenKind::Namespace,
			"alias" => TokenKind::Alias,
			"delpackage" => TokenKind::Delpackage,
			"template" => TokenKind::Template,
			"deltemplate" => TokenKind::Deltemplate,
			"call" => TokenKind::Call,
			"delcall" => TokenKind::Delcall,
			"param" => TokenKind::Param,
			"let" => TokenKind::Let,
			"if" => TokenKind::If,
			"elseif" => TokenKind::ElseIf,
			"else" => TokenKind::Else,
			"switch" => TokenKind::Switch,
			"case" => TokenKind::Case,
			"default" => TokenKind::Default,
			"foreach" => TokenKind::Foreach,
			"for" => TokenKind::For,
			"ifempty" => TokenKind::IfEmpty,
			"msg" => TokenKind::Msg,
			"print" => TokenKind::Print,
			"literal" => TokenKind::Literal,
			"css" => TokenKind::Css,
			"sp" | "nil" | "lb" | "rb" => TokenKind::SpecialChar,
			_ => return None,
		};

		Some(kind)
	}
}

impl Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

static PARSER_VALUES: LazyLock<RwLock<HashMap<TokenKind, i32>>> =
	LazyLock::new(|| RwLock::new(HashMap::new()));

/// Back-fill grammar codes onto [`TokenKind`] from an external symbol table.
///
/// Names that are not token kinds (grammar non-terminals) are skipped.
/// Importing the same table again is a no-op, importing a different code
/// for an already resolved kind is an error. Returns the number of kinds
/// that now have a code.
pub fn import_parser_values<'n>(
	symbols: impl IntoIterator<Item = (&'n str, i32)>,
) -> SoyResult<usize> {
	let mut values = PARSER_VALUES
		.write()
		.unwrap_or_else(PoisonError::into_inner);

	for (name, code) in symbols {
		let Some(kind) = TokenKind::from_name(name) else {
			continue;
		};

		match values.get(&kind) {
			Some(&existing) if existing != code => {
				return Err(SoyError::ParserValuesConflict {
					name: name.to_string(),
					existing,
					proposed: code,
				});
			}
			Some(_) => {}
			None => {
				values.insert(kind, code);
			}
		}
	}

	tracing::debug!(resolved = values.len(), "imported parser values");

	Ok(values.len())
}

/// Typed payload carried by some tokens.
#[derive(Debug, Clone)]
pub enum TokenValue {
	Boolean(bool),
	Integer(i64),
	Float(f64),
	/// A finished doc comment, attached to `DOC_COMMENT_END` and to the
	/// `template` keyword of a closing template tag.
	DocComment(Box<DocCommentBuffer>),
}

impl PartialEq for TokenValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(TokenValue::Boolean(value), TokenValue::Boolean(other_value)) => value == other_value,
			(TokenValue::Integer(value), TokenValue::Integer(other_value)) => value == other_value,
			(TokenValue::Float(value), TokenValue::Float(other_value)) => {
				approx_eq!(f64, *value, *other_value, ulps = 2)
			}
			(TokenValue::DocComment(value), TokenValue::DocComment(other_value)) => {
				value == other_value
			}
			_ => false,
		}
	}
}

/// One lexical unit. Never mutated once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol<'a> {
	pub kind: TokenKind,
	pub text: &'a str,
	/// Byte offset of the first char.
	pub start: usize,
	/// Byte offset one past the last char.
	pub end: usize,
	pub line: usize,
	pub column: usize,
	pub value: Option<TokenValue>,
}

impl Symbol<'_> {
	pub fn len(&self) -> usize {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	pub fn is_ignorable(&self) -> bool {
		self.kind.is_ignorable()
	}

	pub fn doc_comment(&self) -> Option<&DocCommentBuffer> {
		match &self.value {
			Some(TokenValue::DocComment(doc)) => Some(doc.as_ref()),
			_ => None,
		}
	}

	/// The display line and column just past this token. Tabs advance to
	/// the next multiple of 8.
	pub fn location_end(&self) -> (usize, usize) {
		let mut line = self.line;
		let mut column = self.column.saturating_sub(1);

		for ch in self.text.chars() {
			match ch {
				'\n' => {
					line += 1;
					column = 0;
				}
				'\t' => column = (column / 8 + 1) * 8,
				'\r' => column = 0,
				'\u{8}' => column = column.saturating_sub(1),
				_ => column += 1,
			}
		}

		(line, column + 1)
	}
}

impl Display for Symbol<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{} [line:{}|col:{}] <{}>",
			self.kind, self.line, self.column, self.text
		)
	}
}
