use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Inspect how Closure Templates (Soy) files are scanned.",
	long_about = "soy runs the Closure Templates scanner over a file and prints what it \
	              sees.\n\nQuick start:\n  soy tokens file.soy  Dump the token stream\n  soy docs \
	              file.soy    Dump the doc comment of every template"
)]
pub struct SoyCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory. Config files are looked up here
	/// and relative file arguments are resolved against it.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output and debug logging from the scanner.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Print the token stream of a Soy file.
	///
	/// Dotted names and `$` references are split into words the way an
	/// editor sees them unless `--raw` is given or `fragment_words = false`
	/// is set in `soy.toml`.
	Tokens {
		/// The file to scan.
		file: PathBuf,

		/// The mode the scan starts in, e.g. `expression` to scan a bare
		/// expression. Defaults to `[lexer] initial_mode` from the config.
		#[arg(long)]
		mode: Option<String>,

		/// Print scanner tokens without splitting them into words.
		#[arg(long, default_value_t = false)]
		raw: bool,

		/// Leave whitespace and comments out of the dump.
		#[arg(long, default_value_t = false)]
		skip_ignorable: bool,

		/// Output format. Use `text` for one token per line or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Print the doc comment of every template in a Soy file.
	///
	/// Shows the fully qualified template name, its description, declared
	/// parameters and which of them the template body references.
	Docs {
		/// The file to scan.
		file: PathBuf,

		/// The mode the scan starts in. Defaults to `[lexer] initial_mode`
		/// from the config.
		#[arg(long)]
		mode: Option<String>,

		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
