use serde::Serialize;

use crate::ElementKind;
use crate::ElementPath;
use crate::InspectionsConfig;
use crate::NodeCollection;
use crate::NodeId;
use crate::NodeRef;
use crate::PathBuilder;
use crate::Predicate;
use crate::SoyResult;
use crate::SyntaxTree;
use crate::TraverseEmpty;
use crate::TreeNode;

pub const CALL_PARAMETER_NOT_DEFINED: &str = "call-parameter-not-defined";
pub const CALL_MISSING_REQUIRED_PARAM: &str = "call-missing-required-param";
pub const PARAMETER_NOT_USED: &str = "parameter-not-used";
pub const MSG_WITHOUT_DESCRIPTION: &str = "msg-without-description";

pub const INSPECTION_IDS: [&str; 4] = [
	CALL_PARAMETER_NOT_DEFINED,
	CALL_MISSING_REQUIRED_PARAM,
	PARAMETER_NOT_USED,
	MSG_WITHOUT_DESCRIPTION,
];

/// A problem found by one of the inspections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
	pub id: &'static str,
	pub node: NodeId,
	pub message: String,
}

type SoyPath<'t> = ElementPath<NodeRef<'t>>;

fn of_kind<'t>(kind: ElementKind) -> Predicate<NodeRef<'t>> {
	Predicate::kind(kind)
}

/// The namespace declared by the file `node` belongs to.
fn namespace_of(node: &NodeRef<'_>) -> Option<String> {
	let mut root = *node;
	while let Some(parent) = root.parent() {
		root = parent;
	}

	root.children()
		.into_iter()
		.find(|child| child.kind() == ElementKind::NamespaceDef)
		.and_then(|namespace| namespace.name().map(ToString::to_string))
}

/// Whether `callee` names `template`, either by its local `.name` or fully
/// qualified with the file's namespace.
fn calls_template(callee: &str, template: &NodeRef<'_>) -> bool {
	let Some(local) = template.name() else {
		return false;
	};

	if callee == local {
		return true;
	}

	namespace_of(template).is_some_and(|namespace| callee == format!("{namespace}{local}"))
}

fn select_callee<'t>(
	templates: &NodeCollection<NodeRef<'t>>,
	calls: &NodeCollection<NodeRef<'t>>,
) -> NodeCollection<NodeRef<'t>> {
	templates.filtered(|template| {
		calls
			.iter()
			.filter_map(|call| call.name())
			.any(|callee| calls_template(callee, template))
	})
}

/// The root segment of a parameter name, so `$user.name` counts as a use
/// of `user`.
fn root_name<'n>(node: &'n NodeRef<'_>) -> Option<&'n str> {
	node.name().map(|name| name.split('.').next().unwrap_or(name))
}

fn names_absent_from<'t>(
	candidates: &NodeCollection<NodeRef<'t>>,
	present: &NodeCollection<NodeRef<'t>>,
) -> NodeCollection<NodeRef<'t>> {
	candidates.filtered(|candidate| {
		let name = root_name(candidate);
		!present.iter().any(|node| root_name(node) == name)
	})
}

fn undeclared_params<'t>(
	declared: &NodeCollection<NodeRef<'t>>,
	params: &NodeCollection<NodeRef<'t>>,
) -> NodeCollection<NodeRef<'t>> {
	names_absent_from(params, declared)
}

fn missing_required<'t>(
	passed: &NodeCollection<NodeRef<'t>>,
	required: &NodeCollection<NodeRef<'t>>,
) -> NodeCollection<NodeRef<'t>> {
	names_absent_from(required, passed)
}

fn unused_params<'t>(
	references: &NodeCollection<NodeRef<'t>>,
	declared: &NodeCollection<NodeRef<'t>>,
) -> NodeCollection<NodeRef<'t>> {
	names_absent_from(declared, references)
}

/// From a call tag to the `{template}` tags in the same file it names.
fn callee_templates<'t>() -> PathBuilder<NodeRef<'t>> {
	ElementPath::builder()
		.children(of_kind(ElementKind::CallTag))
		.push()
		.first_ancestor(of_kind(ElementKind::SoyFile))
		.children(of_kind(ElementKind::TagAndDocComment))
		.children_of_children(of_kind(ElementKind::TemplateTag))
		.pop_and_join("callee", select_callee)
		.first_ancestor(of_kind(ElementKind::TagAndDocComment))
		.children(of_kind(ElementKind::DocComment))
		.children(of_kind(ElementKind::DocCommentParamDef))
}

/// From a call tag pair to its `{param}` tags that the callee's doc
/// comment does not declare.
pub fn call_parameter_not_defined_path<'t>() -> SoyResult<SoyPath<'t>> {
	let per_call = ElementPath::builder()
		.children(of_kind(ElementKind::ParamTag))
		.push()
		.restart()
		.then(callee_templates())
		.pop_and_join("undeclared params", undeclared_params)
		.traverse_empty(TraverseEmpty::Continue)
		.debug(CALL_PARAMETER_NOT_DEFINED)
		.build()?;

	ElementPath::builder()
		.descendants(of_kind(ElementKind::CallTagPair))
		.fork(per_call)
		.build()
}

/// From a call tag pair to the callee's required doc params it does not
/// pass. A `data="$expr"` call passes an unknown record and is skipped.
/// A `data="all"` call passes the enclosing template's required params.
pub fn call_missing_required_param_path<'t>() -> SoyResult<SoyPath<'t>> {
	let forwarded = ElementPath::builder()
		.children(of_kind(ElementKind::CallTag))
		.keep(Predicate::attribute(Some("data"), Some("^all$"))?)
		.first_ancestor(of_kind(ElementKind::TagAndDocComment))
		.children(of_kind(ElementKind::DocComment))
		.children(of_kind(ElementKind::DocCommentParamDef))
		.keep(Predicate::attribute(Some("optional"), Some("^false$"))?)
		.build()?;
	let passed = ElementPath::builder()
		.children(of_kind(ElementKind::ParamTag))
		.build()?
		.or(forwarded);

	ElementPath::builder()
		.keep(Predicate::custom("passes no data expression", |pair: &NodeRef<'_>| {
			pair.children()
				.iter()
				.filter(|child| child.kind() == ElementKind::CallTag)
				.all(|call| call.attribute("data").is_none_or(|data| data == "all"))
		}))
		.then(callee_templates())
		.keep(Predicate::attribute(Some("optional"), Some("^false$"))?)
		.push()
		.restart()
		.fork(passed)
		.pop_and_join("missing required params", missing_required)
		.traverse_empty(TraverseEmpty::Continue)
		.debug(CALL_MISSING_REQUIRED_PARAM)
		.build()
}

/// From a template's doc comment and tag pair to the declared params its
/// body never references.
pub fn parameter_not_used_path<'t>() -> SoyResult<SoyPath<'t>> {
	let per_template = ElementPath::builder()
		.children(of_kind(ElementKind::DocComment))
		.children(of_kind(ElementKind::DocCommentParamDef))
		.push()
		.parent(of_kind(ElementKind::DocComment))
		.next_siblings(of_kind(ElementKind::TemplateTagPair), false)
		.descendants(of_kind(ElementKind::ParameterRef))
		.pop_and_join("unused params", unused_params)
		.traverse_empty(TraverseEmpty::Continue)
		.debug(PARAMETER_NOT_USED)
		.build()?;

	ElementPath::builder()
		.children(of_kind(ElementKind::TagAndDocComment))
		.fork(per_template)
		.build()
}

pub fn msg_without_description_path<'t>() -> SoyResult<SoyPath<'t>> {
	ElementPath::builder()
		.descendants(of_kind(ElementKind::MsgTag))
		.keep(Predicate::has_attribute("desc").not())
		.debug(MSG_WITHOUT_DESCRIPTION)
		.build()
}

/// Run every enabled inspection over the file rooted at `root`.
pub fn run_inspections(tree: &SyntaxTree, root: NodeId, config: &InspectionsConfig) -> SoyResult<Vec<Finding>> {
	let Some(root) = tree.node(root) else {
		return Ok(vec![]);
	};

	let mut findings = vec![];

	if config.is_enabled(CALL_PARAMETER_NOT_DEFINED) {
		for param in &call_parameter_not_defined_path()?.navigate(&root) {
			let callee = call_name(param.parent().as_ref());
			findings.push(Finding {
				id: CALL_PARAMETER_NOT_DEFINED,
				node: param.id(),
				message: format!(
					"parameter `{}` is not declared by `{callee}`",
					param.name().unwrap_or_default()
				),
			});
		}
	}

	if config.is_enabled(CALL_MISSING_REQUIRED_PARAM) {
		let path = call_missing_required_param_path()?;
		let calls = ElementPath::builder()
			.descendants(of_kind(ElementKind::CallTagPair))
			.build()?
			.navigate(&root);

		for call in &calls {
			let callee = call_name(Some(call));
			for missing in &path.navigate(call) {
				findings.push(Finding {
					id: CALL_MISSING_REQUIRED_PARAM,
					node: call.id(),
					message: format!(
						"call to `{callee}` is missing required parameter `{}`",
						missing.name().unwrap_or_default()
					),
				});
			}
		}
	}

	if config.is_enabled(PARAMETER_NOT_USED) {
		for param in &parameter_not_used_path()?.navigate(&root) {
			findings.push(Finding {
				id: PARAMETER_NOT_USED,
				node: param.id(),
				message: format!("parameter `{}` is never used", param.name().unwrap_or_default()),
			});
		}
	}

	if config.is_enabled(MSG_WITHOUT_DESCRIPTION) {
		for msg in &msg_without_description_path()?.navigate(&root) {
			findings.push(Finding {
				id: MSG_WITHOUT_DESCRIPTION,
				node: msg.id(),
				message: "msg tag has no `desc` attribute".to_string(),
			});
		}
	}

	tracing::debug!(findings = findings.len(), "inspections finished");

	Ok(findings)
}

fn call_name(pair: Option<&NodeRef<'_>>) -> String {
	pair.and_then(|pair| {
		pair.children()
			.into_iter()
			.find(|child| child.kind() == ElementKind::CallTag)
			.and_then(|call| call.name().map(ToString::to_string))
	})
	.unwrap_or_else(|| "???".to_string())
}
