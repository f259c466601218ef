use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Arc;

use regex::Regex;

use crate::SoyError;
use crate::SoyResult;
use crate::TreeNode;

type NodeTest<N> = Arc<dyn Fn(&N) -> bool + Send + Sync>;

/// A test applied to each node a [`Scope`] reaches.
pub enum Predicate<N: TreeNode> {
	Any,
	None,
	Kind(N::Kind),
	Kinds(Vec<N::Kind>),
	Name(String),
	Text(Regex),
	/// A named attribute whose value optionally matches, or any attribute
	/// whose value matches when `name` is `None`.
	Attribute {
		name: Option<String>,
		value: Option<Regex>,
	},
	Custom {
		label: String,
		test: NodeTest<N>,
	},
	Not(Box<Predicate<N>>),
}

impl<N: TreeNode> Predicate<N> {
	pub fn kind(kind: N::Kind) -> Self {
		Self::Kind(kind)
	}

	pub fn kinds(kinds: impl IntoIterator<Item = N::Kind>) -> Self {
		Self::Kinds(kinds.into_iter().collect())
	}

	pub fn name(name: impl Into<String>) -> Self {
		Self::Name(name.into())
	}

	/// Match the node text against `pattern`.
	pub fn text(pattern: &str) -> SoyResult<Self> {
		Ok(Self::Text(Regex::new(pattern)?))
	}

	pub fn has_attribute(name: impl Into<String>) -> Self {
		Self::Attribute {
			name: Some(name.into()),
			value: None,
		}
	}

	/// Match an attribute value. With no name, any attribute may match.
	pub fn attribute(name: Option<&str>, value: Option<&str>) -> SoyResult<Self> {
		if name.is_none() && value.is_none() {
			return Err(SoyError::InvalidTraversal(
				"an attribute predicate needs a name, a value pattern, or both".to_string(),
			));
		}

		Ok(Self::Attribute {
			name: name.map(ToString::to_string),
			value: value.map(Regex::new).transpose()?,
		})
	}

	pub fn custom(label: impl Into<String>, test: impl Fn(&N) -> bool + Send + Sync + 'static) -> Self {
		Self::Custom {
			label: label.into(),
			test: Arc::new(test),
		}
	}

	#[must_use]
	pub fn not(self) -> Self {
		match self {
			Self::Any => Self::None,
			Self::None => Self::Any,
			Self::Not(inner) => *inner,
			other => Self::Not(Box::new(other)),
		}
	}

	pub fn test(&self, node: &N) -> bool {
		match self {
			Self::Any => true,
			Self::None => false,
			Self::Kind(kind) => node.kind() == *kind,
			Self::Kinds(kinds) => kinds.contains(&node.kind()),
			Self::Name(name) => node.name() == Some(name.as_str()),
			Self::Text(pattern) => pattern.is_match(node.text()),
			Self::Attribute { name: Some(name), value } => {
				node.attribute(name)
					.is_some_and(|found| value.as_ref().is_none_or(|value| value.is_match(found)))
			}
			Self::Attribute { name: None, value } => {
				node.attributes()
					.iter()
					.any(|(_, found)| value.as_ref().is_none_or(|value| value.is_match(found)))
			}
			Self::Custom { test, .. } => test(node),
			Self::Not(inner) => !inner.test(node),
		}
	}
}

impl<N: TreeNode> Clone for Predicate<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Any => Self::Any,
			Self::None => Self::None,
			Self::Kind(kind) => Self::Kind(*kind),
			Self::Kinds(kinds) => Self::Kinds(kinds.clone()),
			Self::Name(name) => Self::Name(name.clone()),
			Self::Text(pattern) => Self::Text(pattern.clone()),
			Self::Attribute { name, value } => {
				Self::Attribute {
					name: name.clone(),
					value: value.clone(),
				}
			}
			Self::Custom { label, test } => {
				Self::Custom {
					label: label.clone(),
					test: Arc::clone(test),
				}
			}
			Self::Not(inner) => Self::Not(inner.clone()),
		}
	}
}

impl<N: TreeNode> Display for Predicate<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Any => f.write_str("*"),
			Self::None => f.write_str("!*"),
			Self::Kind(kind) => write!(f, "{kind}"),
			Self::Kinds(kinds) => {
				let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
				write!(f, "({})", names.join("|"))
			}
			Self::Name(name) => write!(f, "[name={name}]"),
			Self::Text(pattern) => write!(f, "[text~/{pattern}/]"),
			Self::Attribute { name, value } => {
				let name = name.as_deref().unwrap_or("*");
				match value {
					Some(value) => write!(f, "[@{name}~/{value}/]"),
					None => write!(f, "[@{name}]"),
				}
			}
			Self::Custom { label, .. } => f.write_str(label),
			Self::Not(inner) => write!(f, "!{inner}"),
		}
	}
}

impl<N: TreeNode> Debug for Predicate<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Predicate({self})")
	}
}

/// Which nodes, relative to each node of the current collection, a
/// predicate is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
	SelfOnly,
	Children,
	ChildrenOfChildren,
	/// The first child that matches.
	FirstChild,
	/// All descendants, breadth first.
	Descendants,
	/// Descendants between two depths, both inclusive. Depth 1 is the
	/// children.
	DescendantsWithin {
		from: usize,
		to: usize,
	},
	Parent,
	/// Self and every ancestor up to the root.
	Ancestors,
	/// The nearest ancestor that matches, starting with self.
	FirstAncestor,
	/// The nearest following sibling that matches.
	NextSibling,
	PreviousSiblings {
		include_self: bool,
	},
	NextSiblings {
		include_self: bool,
	},
}

impl Scope {
	pub fn validate(self) -> SoyResult<()> {
		match self {
			Self::DescendantsWithin { from: 0, .. } => {
				Err(SoyError::InvalidTraversal(
					"descendant depths start at 1".to_string(),
				))
			}
			Self::DescendantsWithin { from, to } if to < from => {
				Err(SoyError::InvalidTraversal(format!(
					"descendant depth range {from}..={to} is empty"
				)))
			}
			_ => Ok(()),
		}
	}

	/// Apply `predicate` in this scope around `node`, adding matches to
	/// `found` in encounter order.
	pub(crate) fn collect<N: TreeNode>(self, node: &N, predicate: &Predicate<N>, found: &mut Vec<N>) {
		match self {
			Self::SelfOnly => push_if(node.clone(), predicate, found),
			Self::Children => {
				for child in node.children() {
					push_if(child, predicate, found);
				}
			}
			Self::ChildrenOfChildren => {
				for child in node.children() {
					for grandchild in child.children() {
						push_if(grandchild, predicate, found);
					}
				}
			}
			Self::FirstChild => {
				if let Some(child) = node.children().into_iter().find(|child| predicate.test(child)) {
					found.push(child);
				}
			}
			Self::Descendants => collect_descendants(node, 1, usize::MAX, predicate, found),
			Self::DescendantsWithin { from, to } => collect_descendants(node, from, to, predicate, found),
			Self::Parent => {
				if let Some(parent) = node.parent() {
					push_if(parent, predicate, found);
				}
			}
			Self::Ancestors => {
				let mut current = Some(node.clone());
				while let Some(ancestor) = current {
					current = ancestor.parent();
					push_if(ancestor, predicate, found);
				}
			}
			Self::FirstAncestor => {
				let mut current = Some(node.clone());
				while let Some(ancestor) = current {
					if predicate.test(&ancestor) {
						found.push(ancestor);
						return;
					}
					current = ancestor.parent();
				}
			}
			Self::NextSibling => {
				let (_, after) = node.siblings();
				if let Some(sibling) = after.into_iter().find(|sibling| predicate.test(sibling)) {
					found.push(sibling);
				}
			}
			Self::PreviousSiblings { include_self } => {
				let (before, _) = node.siblings();
				for sibling in before {
					push_if(sibling, predicate, found);
				}
				if include_self {
					push_if(node.clone(), predicate, found);
				}
			}
			Self::NextSiblings { include_self } => {
				if include_self {
					push_if(node.clone(), predicate, found);
				}
				let (_, after) = node.siblings();
				for sibling in after {
					push_if(sibling, predicate, found);
				}
			}
		}
	}
}

impl Display for Scope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::SelfOnly => f.write_str("self"),
			Self::Children => f.write_str("children"),
			Self::ChildrenOfChildren => f.write_str("children/children"),
			Self::FirstChild => f.write_str("first-child"),
			Self::Descendants => f.write_str("descendants"),
			Self::DescendantsWithin { from, to } => write!(f, "descendants[{from}..={to}]"),
			Self::Parent => f.write_str("parent"),
			Self::Ancestors => f.write_str("ancestors"),
			Self::FirstAncestor => f.write_str("first-ancestor"),
			Self::NextSibling => f.write_str("next-sibling"),
			Self::PreviousSiblings { include_self: true } => f.write_str("previous-siblings-or-self"),
			Self::PreviousSiblings { include_self: false } => f.write_str("previous-siblings"),
			Self::NextSiblings { include_self: true } => f.write_str("next-siblings-or-self"),
			Self::NextSiblings { include_self: false } => f.write_str("next-siblings"),
		}
	}
}

fn push_if<N: TreeNode>(node: N, predicate: &Predicate<N>, found: &mut Vec<N>) {
	if predicate.test(&node) {
		found.push(node);
	}
}

fn collect_descendants<N: TreeNode>(node: &N, from: usize, to: usize, predicate: &Predicate<N>, found: &mut Vec<N>) {
	let mut level = node.children();
	let mut depth = 1;

	while !level.is_empty() && depth <= to {
		let mut next = vec![];
		for descendant in level {
			if depth < to {
				next.extend(descendant.children());
			}
			if depth >= from {
				push_if(descendant, predicate, found);
			}
		}

		level = next;
		depth += 1;
	}
}
