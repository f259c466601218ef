use crate::ElementKind;
use crate::ElementSpec;
use crate::NodeId;
use crate::SoyResult;
use crate::SyntaxTree;

pub const DOCUMENTED_TEMPLATE: &str = "{namespace example}

/**
 * Says hello.
 * @param name who to greet
 * @param? greeting optional text
 */
{template .hello}
  {$greeting} {$name}
{/template}
";

pub const SCENARIO_B_COMMENT: &str = "/**\n * @param required\n * @param? optional some text\n */";

/// Inputs that exercise every scanner mode, used for whole-stream
/// properties.
pub const SCANNER_INPUTS: [&str; 8] = [
	"{template .foo}",
	DOCUMENTED_TEMPLATE,
	"{call .bar data=\"all\"}{param x: 5 /}{/call}",
	"{if not $a and true}yes{elseif $b?.c}maybe{else}no{/if}",
	"{literal}{x}{/literal} // trailing",
	"{'abc}\nnext",
	"{$x|escapeHtml|truncate:5,true}",
	"{msg desc=\"Greeting for $name\"}Hi{/msg}",
];

/// A file node with two `param_tag` children, `x` and `y`. Only `x` has a
/// `parameter_ref` child, also named `x`.
pub fn scenario_d_tree() -> SoyResult<SyntaxTree> {
	let mut tree = SyntaxTree::new();
	let file = tree.build_node(ElementKind::SoyFile, None, &ElementSpec::default())?;
	let first = tree.build_node(ElementKind::ParamTag, Some(file), &ElementSpec::named("x"))?;
	tree.build_node(ElementKind::ParameterRef, Some(first), &ElementSpec::named("x"))?;
	tree.build_node(ElementKind::ParamTag, Some(file), &ElementSpec::named("y"))?;
	Ok(tree)
}

/// Node ids of [`shape_tree`], in build order.
pub struct ShapeTree {
	pub tree: SyntaxTree,
	pub file: NodeId,
	pub namespace: NodeId,
	pub doc_pair: NodeId,
	pub doc: NodeId,
	pub template_pair: NodeId,
	pub template: NodeId,
	pub print: NodeId,
	pub reference: NodeId,
	pub msg: NodeId,
	pub text: NodeId,
}

/// ```text
/// soy_file
/// ├── namespace_def (example)
/// └── tag_and_doc_comment
///     ├── doc_comment
///     └── template_tag_pair
///         ├── template_tag (.hello)
///         ├── print_tag
///         │   └── parameter_ref (name)
///         ├── msg_tag [desc="Greeting"]
///         └── template_text
/// ```
pub fn shape_tree() -> SoyResult<ShapeTree> {
	let mut tree = SyntaxTree::new();
	let file = tree.build_node(ElementKind::SoyFile, None, &ElementSpec::default())?;
	let namespace = tree.build_node(ElementKind::NamespaceDef, Some(file), &ElementSpec::named("example"))?;
	let doc_pair = tree.build_node(ElementKind::TagAndDocComment, Some(file), &ElementSpec::default())?;
	let doc = tree.build_node(ElementKind::DocComment, Some(doc_pair), &ElementSpec::text("/** Says hello. */"))?;
	let template_pair = tree.build_node(ElementKind::TemplateTagPair, Some(doc_pair), &ElementSpec::default())?;
	let template = tree.build_node(ElementKind::TemplateTag, Some(template_pair), &ElementSpec::named(".hello"))?;
	let print = tree.build_node(ElementKind::PrintTag, Some(template_pair), &ElementSpec::text("{$name}"))?;
	let reference = tree.build_node(ElementKind::ParameterRef, Some(print), &ElementSpec::named("name"))?;
	let msg = tree.build_node(
		ElementKind::MsgTag,
		Some(template_pair),
		&ElementSpec::text("{msg desc=\"Greeting\"}").attribute("desc", "Greeting"),
	)?;
	let text = tree.build_node(ElementKind::TemplateText, Some(template_pair), &ElementSpec::text("Hello world"))?;

	Ok(ShapeTree {
		tree,
		file,
		namespace,
		doc_pair,
		doc,
		template_pair,
		template,
		print,
		reference,
		msg,
		text,
	})
}

fn param_def(tree: &mut SyntaxTree, doc: NodeId, name: &str, optional: bool) -> SoyResult<NodeId> {
	let spec = ElementSpec::named(name).attribute("optional", if optional { "true" } else { "false" });
	tree.build_node(ElementKind::DocCommentParamDef, Some(doc), &spec)
}

fn call(tree: &mut SyntaxTree, parent: NodeId, callee: &str, data: Option<&str>, params: &[&str]) -> SoyResult<NodeId> {
	let pair = tree.build_node(ElementKind::CallTagPair, Some(parent), &ElementSpec::default())?;
	let mut spec = ElementSpec::named(callee);
	if let Some(data) = data {
		spec = spec.attribute("data", data);
	}
	tree.build_node(ElementKind::CallTag, Some(pair), &spec)?;

	for param in params {
		tree.build_node(ElementKind::ParamTag, Some(pair), &ElementSpec::named(param))?;
	}

	Ok(pair)
}

/// Two documented templates in namespace `example`:
///
/// - `.hello` declares `name` and `unused?`, prints `$name`, calls
///   `.greet` three times and has two `{msg}` tags, one without `desc`.
/// - `.greet` declares `who` and `name`, and only prints `$who.first`.
pub fn inspection_tree() -> SoyResult<SyntaxTree> {
	let mut tree = SyntaxTree::new();
	let file = tree.build_node(ElementKind::SoyFile, None, &ElementSpec::default())?;
	tree.build_node(ElementKind::NamespaceDef, Some(file), &ElementSpec::named("example"))?;

	let hello = tree.build_node(ElementKind::TagAndDocComment, Some(file), &ElementSpec::default())?;
	let hello_doc = tree.build_node(ElementKind::DocComment, Some(hello), &ElementSpec::default())?;
	param_def(&mut tree, hello_doc, "name", false)?;
	param_def(&mut tree, hello_doc, "unused", true)?;
	let hello_pair = tree.build_node(ElementKind::TemplateTagPair, Some(hello), &ElementSpec::default())?;
	tree.build_node(ElementKind::TemplateTag, Some(hello_pair), &ElementSpec::named(".hello"))?;
	let print = tree.build_node(ElementKind::PrintTag, Some(hello_pair), &ElementSpec::default())?;
	tree.build_node(ElementKind::ParameterRef, Some(print), &ElementSpec::named("name"))?;
	call(&mut tree, hello_pair, ".greet", None, &["who", "extra"])?;
	call(&mut tree, hello_pair, "example.greet", Some("all"), &[])?;
	call(&mut tree, hello_pair, ".greet", Some("$data"), &[])?;
	tree.build_node(ElementKind::MsgTag, Some(hello_pair), &ElementSpec::default())?;
	tree.build_node(
		ElementKind::MsgTag,
		Some(hello_pair),
		&ElementSpec::default().attribute("desc", "Greeting"),
	)?;

	let greet = tree.build_node(ElementKind::TagAndDocComment, Some(file), &ElementSpec::default())?;
	let greet_doc = tree.build_node(ElementKind::DocComment, Some(greet), &ElementSpec::default())?;
	param_def(&mut tree, greet_doc, "who", false)?;
	param_def(&mut tree, greet_doc, "name", false)?;
	let greet_pair = tree.build_node(ElementKind::TemplateTagPair, Some(greet), &ElementSpec::default())?;
	tree.build_node(ElementKind::TemplateTag, Some(greet_pair), &ElementSpec::named(".greet"))?;
	let print = tree.build_node(ElementKind::PrintTag, Some(greet_pair), &ElementSpec::default())?;
	tree.build_node(ElementKind::ParameterRef, Some(print), &ElementSpec::named("who.first"))?;

	Ok(tree)
}
