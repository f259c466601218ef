/// A location in a source buffer. Lines and columns are 1-based and columns
/// count chars, offsets are byte offsets into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Point {
	pub fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// The first char of a buffer range that starts at `offset`.
	pub fn start_of(offset: usize) -> Self {
		Self::new(1, 1, offset)
	}

	/// Move the point past `text`.
	pub fn advance_str(&mut self, text: &str) {
		for ch in text.chars() {
			if ch == '\n' {
				self.line += 1;
				self.column = 1;
			} else {
				self.column += 1;
			}
		}

		self.offset += text.len();
	}
}
