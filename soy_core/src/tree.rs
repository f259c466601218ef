use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::Serialize;

use crate::SoyError;
use crate::SoyResult;

/// The view of a tree that element paths navigate.
///
/// A node is a cheap handle. Two handles are equal when they point at the
/// same node, which is what result collections deduplicate on.
pub trait TreeNode: Clone + Eq + Hash + Debug {
	type Kind: Copy + Eq + Debug + Display;

	fn kind(&self) -> Self::Kind;
	fn parent(&self) -> Option<Self>;
	fn children(&self) -> Vec<Self>;
	/// The name a node is referred to by, such as a template or parameter
	/// name.
	fn name(&self) -> Option<&str>;
	fn text(&self) -> &str;
	fn attribute(&self, name: &str) -> Option<&str>;
	/// Every `(name, value)` pair, in declaration order.
	fn attributes(&self) -> Vec<(&str, &str)>;

	/// Siblings before and after this node, split around it.
	fn siblings(&self) -> (Vec<Self>, Vec<Self>) {
		let Some(parent) = self.parent() else {
			return (vec![], vec![]);
		};

		let mut children = parent.children();
		let Some(index) = children.iter().position(|child| child == self) else {
			return (vec![], vec![]);
		};

		let after = children.split_off(index + 1);
		children.pop();
		(children, after)
	}
}

/// The Soy elements a tree builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
	SoyFile,
	NamespaceDef,
	/// A doc comment together with the template it documents.
	TagAndDocComment,
	DocComment,
	DocCommentParamDef,
	/// `{template}` ... `{/template}`
	TemplateTagPair,
	TemplateTag,
	CallTagPair,
	CallTag,
	ParamTag,
	ParameterRef,
	MsgTag,
	PrintTag,
	TemplateText,
}

impl ElementKind {
	pub const ALL: [ElementKind; 14] = [
		ElementKind::SoyFile,
		ElementKind::NamespaceDef,
		ElementKind::TagAndDocComment,
		ElementKind::DocComment,
		ElementKind::DocCommentParamDef,
		ElementKind::TemplateTagPair,
		ElementKind::TemplateTag,
		ElementKind::CallTagPair,
		ElementKind::CallTag,
		ElementKind::ParamTag,
		ElementKind::ParameterRef,
		ElementKind::MsgTag,
		ElementKind::PrintTag,
		ElementKind::TemplateText,
	];

	pub const fn name(self) -> &'static str {
		match self {
			ElementKind::SoyFile => "soy_file",
			ElementKind::NamespaceDef => "namespace_def",
			ElementKind::TagAndDocComment => "tag_and_doc_comment",
			ElementKind::DocComment => "doc_comment",
			ElementKind::DocCommentParamDef => "doc_comment_param_def",
			ElementKind::TemplateTagPair => "template_tag_pair",
			ElementKind::TemplateTag => "template_tag",
			ElementKind::CallTagPair => "call_tag_pair",
			ElementKind::CallTag => "call_tag",
			ElementKind::ParamTag => "param_tag",
			ElementKind::ParameterRef => "parameter_ref",
			ElementKind::MsgTag => "msg_tag",
			ElementKind::PrintTag => "print_tag",
			ElementKind::TemplateText => "template_text",
		}
	}

	/// Elements whose `name` identifies something: namespaces, templates,
	/// callees and parameters.
	pub const fn is_name_bearing(self) -> bool {
		matches!(
			self,
			ElementKind::NamespaceDef
				| ElementKind::DocCommentParamDef
				| ElementKind::TemplateTag
				| ElementKind::CallTag
				| ElementKind::ParamTag
				| ElementKind::ParameterRef
		)
	}

	pub const fn declares_parameters(self) -> bool {
		matches!(self, ElementKind::DocComment | ElementKind::TagAndDocComment)
	}

	pub const fn is_call_site(self) -> bool {
		matches!(self, ElementKind::CallTagPair | ElementKind::CallTag)
	}
}

impl Display for ElementKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
	pub fn index(self) -> usize {
		self.0
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
	pub kind: ElementKind,
	pub name: Option<String>,
	pub text: String,
	pub attributes: IndexMap<String, String>,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

impl NodeData {
	fn new(kind: ElementKind) -> Self {
		Self {
			kind,
			name: None,
			text: String::new(),
			attributes: IndexMap::new(),
			parent: None,
			children: vec![],
		}
	}

	fn named(kind: ElementKind, name: &str) -> Self {
		Self {
			name: Some(name.to_string()),
			text: name.to_string(),
			..Self::new(kind)
		}
	}

	fn with_attribute(mut self, name: &str, value: &str) -> Self {
		self.attributes.insert(name.to_string(), value.to_string());
		self
	}
}

/// What a tree builder knows about an element before it is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSpec<'s> {
	pub name: Option<&'s str>,
	pub text: Option<&'s str>,
	pub attributes: Vec<(&'s str, &'s str)>,
}

impl<'s> ElementSpec<'s> {
	pub fn named(name: &'s str) -> Self {
		Self {
			name: Some(name),
			..Self::default()
		}
	}

	pub fn text(text: &'s str) -> Self {
		Self {
			text: Some(text),
			..Self::default()
		}
	}

	#[must_use]
	pub fn attribute(mut self, name: &'s str, value: &'s str) -> Self {
		self.attributes.push((name, value));
		self
	}
}

fn build_plain(kind: ElementKind, spec: &ElementSpec<'_>) -> NodeData {
	let mut data = NodeData::new(kind);
	data.text = spec.text.unwrap_or_default().to_string();
	data
}

fn build_named(kind: ElementKind, spec: &ElementSpec<'_>) -> NodeData {
	let name = spec.name.unwrap_or_default();
	let mut data = NodeData::named(kind, name);
	if let Some(text) = spec.text {
		data.text = text.to_string();
	}
	data
}

fn build_param_def(spec: &ElementSpec<'_>) -> NodeData {
	let optional = spec
		.attributes
		.iter()
		.any(|(name, value)| *name == "optional" && *value == "true");
	build_named(ElementKind::DocCommentParamDef, spec).with_attribute("optional", if optional { "true" } else { "false" })
}

/// Kind to constructor dispatch. Attributes from the spec are applied
/// afterwards so kind-specific defaults can be overridden.
fn construct(kind: ElementKind, spec: &ElementSpec<'_>) -> NodeData {
	match kind {
		ElementKind::DocCommentParamDef => build_param_def(spec),
		ElementKind::NamespaceDef
		| ElementKind::TemplateTag
		| ElementKind::CallTag
		| ElementKind::ParamTag
		| ElementKind::ParameterRef => build_named(kind, spec),
		ElementKind::SoyFile
		| ElementKind::TagAndDocComment
		| ElementKind::DocComment
		| ElementKind::TemplateTagPair
		| ElementKind::CallTagPair
		| ElementKind::MsgTag
		| ElementKind::PrintTag
		| ElementKind::TemplateText => build_plain(kind, spec),
	}
}

/// An arena of Soy elements. Node handles borrow the tree, so a tree is
/// frozen while it is being navigated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
	nodes: Vec<NodeData>,
}

impl SyntaxTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a node from `spec` and attach it under `parent`, or as a root
	/// when `parent` is `None`.
	///
	/// Fails with [`SoyError::UnknownParent`] when `parent` does not name a
	/// node of this tree. The tree is left unchanged.
	pub fn build_node(
		&mut self,
		kind: ElementKind,
		parent: Option<NodeId>,
		spec: &ElementSpec<'_>,
	) -> SoyResult<NodeId> {
		if let Some(unknown) = parent.filter(|parent| parent.0 >= self.nodes.len()) {
			return Err(SoyError::UnknownParent {
				parent: unknown.0,
				len: self.nodes.len(),
			});
		}

		let mut data = construct(kind, spec);
		for (name, value) in &spec.attributes {
			data.attributes.insert((*name).to_string(), (*value).to_string());
		}

		let id = NodeId(self.nodes.len());
		data.parent = parent;
		self.nodes.push(data);

		if let Some(parent) = parent {
			self.nodes[parent.0].children.push(id);
		}

		Ok(id)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn data(&self, id: NodeId) -> Option<&NodeData> {
		self.nodes.get(id.0)
	}

	/// A navigable handle for `id`.
	pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
		self.nodes.get(id.0).map(|_| NodeRef { tree: self, id })
	}

	/// The first node without a parent.
	pub fn root(&self) -> Option<NodeRef<'_>> {
		self.nodes
			.iter()
			.position(|data| data.parent.is_none())
			.map(|index| NodeRef { tree: self, id: NodeId(index) })
	}
}

/// A handle to one node of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
	tree: &'t SyntaxTree,
	id: NodeId,
}

impl<'t> NodeRef<'t> {
	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn tree(&self) -> &'t SyntaxTree {
		self.tree
	}

	fn data(&self) -> &'t NodeData {
		&self.tree.nodes[self.id.0]
	}

	fn handle(&self, id: NodeId) -> NodeRef<'t> {
		NodeRef { tree: self.tree, id }
	}
}

impl PartialEq for NodeRef<'_> {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self.tree, other.tree) && self.id == other.id
	}
}

impl Eq for NodeRef<'_> {}

impl Hash for NodeRef<'_> {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl Debug for NodeRef<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let data = self.data();
		match &data.name {
			Some(name) => write!(f, "{}#{}({name})", data.kind, self.id.0),
			None => write!(f, "{}#{}", data.kind, self.id.0),
		}
	}
}

impl TreeNode for NodeRef<'_> {
	type Kind = ElementKind;

	fn kind(&self) -> ElementKind {
		self.data().kind
	}

	fn parent(&self) -> Option<Self> {
		self.data().parent.map(|id| self.handle(id))
	}

	fn children(&self) -> Vec<Self> {
		self.data().children.iter().map(|id| self.handle(*id)).collect()
	}

	fn name(&self) -> Option<&str> {
		self.data().name.as_deref()
	}

	fn text(&self) -> &str {
		&self.data().text
	}

	fn attribute(&self, name: &str) -> Option<&str> {
		self.data().attributes.get(name).map(String::as_str)
	}

	fn attributes(&self) -> Vec<(&str, &str)> {
		self.data()
			.attributes
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_str()))
			.collect()
	}
}
