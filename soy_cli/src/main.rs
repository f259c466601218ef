use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use soy_cli::Commands;
use soy_cli::OutputFormat;
use soy_cli::SoyCli;
use soy_core::AnyEmptyResult;
use soy_core::DocCommentBuffer;
use soy_core::InferredType;
use soy_core::LexMode;
use soy_core::SoyConfig;
use soy_core::SoyResult;
use soy_core::Symbol;
use soy_core::TokenKind;
use soy_core::WordScanningLexer;
use soy_core::tokenize_range;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = SoyCli::parse();

	// Respect NO_COLOR, --no-color and terminals without color support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let Some(command) = &args.command else {
		eprintln!("No subcommand specified. Run `soy --help` for usage.");
		process::exit(1);
	};

	let result = load_config(&args).and_then(|config| {
		init_tracing(args.verbose, config.logging.filter.as_deref());

		match command {
			Commands::Tokens {
				file,
				mode,
				raw,
				skip_ignorable,
				format,
			} => {
				run_tokens(
					&args,
					&config,
					file,
					mode.as_deref(),
					*raw,
					*skip_ignorable,
					*format,
				)
			}
			Commands::Docs { file, mode, format } => run_docs(&args, &config, file, mode.as_deref(), *format),
		}
	});

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<soy_core::SoyError>() {
			Ok(soy_err) => {
				let report: miette::Report = (*soy_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn resolve_root(args: &SoyCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn resolve_file(args: &SoyCli, file: &Path) -> PathBuf {
	if file.is_absolute() {
		file.to_path_buf()
	} else {
		resolve_root(args).join(file)
	}
}

fn load_config(args: &SoyCli) -> Result<SoyConfig, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = SoyConfig::load(&root)?;

	if args.verbose {
		match SoyConfig::resolve_path(&root) {
			Some(path) => eprintln!("Using config: {}", path.display()),
			None => eprintln!("No config found in {}", root.display()),
		}
	}

	Ok(config.unwrap_or_default())
}

/// `--verbose` wins over `RUST_LOG`, which wins over `[logging] filter`.
fn init_tracing(verbose: bool, configured: Option<&str>) {
	let filter = if verbose {
		EnvFilter::new("soy_core=debug")
	} else if let Ok(filter) = EnvFilter::try_from_default_env() {
		filter
	} else {
		EnvFilter::new(configured.unwrap_or("warn"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn scan(source: &str, mode: LexMode, fragment_words: bool) -> SoyResult<Vec<Symbol<'_>>> {
	if !fragment_words {
		return tokenize_range(source, 0, source.len(), mode);
	}

	let mut lexer = WordScanningLexer::new();
	lexer.start(source, 0, source.len(), mode)?;

	let mut symbols = vec![];
	loop {
		let symbol = lexer.advance();
		if symbol.kind == TokenKind::Eof {
			return Ok(symbols);
		}
		symbols.push(symbol.clone());
	}
}

fn scan_mode(config: &SoyConfig, mode: Option<&str>) -> SoyResult<LexMode> {
	match mode {
		Some(mode) => mode.parse::<LexMode>(),
		None => config.lexer.initial_mode(),
	}
}

fn run_tokens(
	args: &SoyCli,
	config: &SoyConfig,
	file: &Path,
	mode: Option<&str>,
	raw: bool,
	skip_ignorable: bool,
	format: OutputFormat,
) -> AnyEmptyResult {
	let path = resolve_file(args, file);
	let source = std::fs::read_to_string(&path)?;
	let mode = scan_mode(config, mode)?;
	let fragment_words = config.lexer.fragment_words && !raw;
	let skip_ignorable = skip_ignorable || config.lexer.skip_ignorable;

	let symbols: Vec<Symbol<'_>> = scan(&source, mode, fragment_words)?
		.into_iter()
		.filter(|symbol| !(skip_ignorable && symbol.is_ignorable()))
		.collect();

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = symbols
				.iter()
				.map(|symbol| {
					serde_json::json!({
						"kind": symbol.kind.name(),
						"text": symbol.text,
						"start": symbol.start,
						"end": symbol.end,
						"line": symbol.line,
						"column": symbol.column,
						"error": symbol.kind.is_error(),
					})
				})
				.collect();
			println!("{}", serde_json::to_string_pretty(&entries)?);
		}
		OutputFormat::Text => {
			for symbol in &symbols {
				let position = format!("{}:{}", symbol.line, symbol.column);
				let kind = format!("{:<28}", symbol.kind.name());
				let kind = if symbol.kind.is_error() {
					colored!(kind, red)
				} else {
					kind
				};
				println!("{position:<8} {kind} {:?}", symbol.text);
			}

			let errors = symbols.iter().filter(|symbol| symbol.kind.is_error()).count();
			if args.verbose {
				eprintln!("Scanned {} token(s) in {} mode", symbols.len(), mode);
			}
			if errors > 0 {
				eprintln!(
					"{} {errors} malformed token(s) in {}",
					colored!("warning:", yellow),
					path.display()
				);
			}
		}
	}

	Ok(())
}

fn finished_doc_comments<'s>(symbols: &'s [Symbol<'_>]) -> Vec<&'s DocCommentBuffer> {
	symbols
		.iter()
		.filter(|symbol| matches!(symbol.kind, TokenKind::Template | TokenKind::Deltemplate))
		.filter_map(Symbol::doc_comment)
		.collect()
}

fn usage_label(usage: InferredType) -> &'static str {
	if usage == InferredType::Undefined {
		"unused"
	} else {
		"used"
	}
}

fn run_docs(
	args: &SoyCli,
	config: &SoyConfig,
	file: &Path,
	mode: Option<&str>,
	format: OutputFormat,
) -> AnyEmptyResult {
	let path = resolve_file(args, file);
	let source = std::fs::read_to_string(&path)?;
	let mode = scan_mode(config, mode)?;
	let symbols = tokenize_range(&source, 0, source.len(), mode)?;
	let docs = finished_doc_comments(&symbols);

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = docs
				.iter()
				.map(|doc| {
					let parameters: Vec<serde_json::Value> = doc
						.parameters()
						.iter()
						.map(|(name, parameter)| {
							serde_json::json!({
								"name": name,
								"optional": parameter.optional,
								"description": parameter.description,
								"usage": doc.parameter_usage(name),
							})
						})
						.collect();

					serde_json::json!({
						"template": doc.fq_template_name(),
						"line": doc.template_declaration_line(),
						"description": doc.description(),
						"parameters": parameters,
					})
				})
				.collect();
			println!("{}", serde_json::to_string_pretty(&entries)?);
		}
		OutputFormat::Text => {
			if docs.is_empty() {
				println!("No documented templates found in {}", path.display());
				return Ok(());
			}

			for doc in docs {
				let line = doc
					.template_declaration_line()
					.map(|line| format!(" (line {line})"))
					.unwrap_or_default();
				println!("{}{line}", colored!(doc.fq_template_name(), bold));

				if let Some(description) = doc.description() {
					println!("  {description}");
				}

				for (name, parameter) in doc.parameters() {
					let marker = if parameter.optional { "@param?" } else { "@param" };
					let usage = usage_label(doc.parameter_usage(name));
					if parameter.description.is_empty() {
						println!("  {marker} {name} [{usage}]");
					} else {
						println!("  {marker} {name}: {} [{usage}]", parameter.description);
					}
				}
			}
		}
	}

	Ok(())
}
