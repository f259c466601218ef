use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Arc;

use crate::NodeCollection;
use crate::Predicate;
use crate::Scope;
use crate::SoyError;
use crate::SoyResult;
use crate::TreeNode;

type JoinFn<N> = Arc<dyn Fn(&NodeCollection<N>, &NodeCollection<N>) -> NodeCollection<N> + Send + Sync>;

/// What happens when a step leaves the working collection empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TraverseEmpty {
	/// Navigation ends with an empty result once the working collection
	/// and every pushed collection are empty. Stack steps still run on an
	/// empty working collection so saved results are never lost.
	#[default]
	Stop,
	/// Later steps still run. A `pop`, `restart` or join can make the
	/// collection non-empty again.
	Continue,
}

enum Step<N: TreeNode> {
	Filter {
		scope: Scope,
		predicate: Predicate<N>,
	},
	/// Save a copy of the working collection.
	Push,
	/// Save the matching nodes and keep working with the rest.
	PushMatching(Predicate<N>),
	/// Exchange the working collection with the top of the stack.
	Swap,
	/// Replace the working collection with the top of the stack.
	Pop,
	/// Add the working collection to the top of the stack and continue
	/// with the union.
	PopAdd,
	/// `join(current, popped)` becomes the working collection.
	PopAndJoin {
		label: String,
		join: JoinFn<N>,
	},
	/// Continue from the collection navigation started with.
	Restart,
	/// Run a path from each node and union the results.
	Fork(ElementPath<N>),
	Log(String),
}

impl<N: TreeNode> Step<N> {
	/// Steps that read the stack run even when the working collection is
	/// empty.
	fn reads_stack(&self) -> bool {
		matches!(self, Step::Swap | Step::Pop | Step::PopAdd | Step::PopAndJoin { .. })
	}
}

impl<N: TreeNode> Display for Step<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Step::Filter { scope, predicate } => write!(f, "{scope}::{predicate}"),
			Step::Push => f.write_str("push"),
			Step::PushMatching(predicate) => write!(f, "push[{predicate}]"),
			Step::Swap => f.write_str("swap"),
			Step::Pop => f.write_str("pop"),
			Step::PopAdd => f.write_str("pop-add"),
			Step::PopAndJoin { label, .. } => write!(f, "pop-join[{label}]"),
			Step::Restart => f.write_str("restart"),
			Step::Fork(path) => write!(f, "fork[{}]", path.label().unwrap_or("anonymous")),
			Step::Log(label) => write!(f, "log[{label}]"),
		}
	}
}

#[derive(Clone)]
enum Program<N: TreeNode> {
	Steps(Arc<Vec<Step<N>>>),
	/// Union of every path run from the same start, in order.
	Or(Vec<ElementPath<N>>),
	/// The base result minus whatever the excluded paths find.
	Exclude {
		base: Box<ElementPath<N>>,
		excluded: Vec<ElementPath<N>>,
	},
	/// Each path starts from the result of the previous one.
	Append(Vec<ElementPath<N>>),
}

/// A reusable, declarative query over a [`TreeNode`] tree.
///
/// Paths are built once with [`ElementPath::builder`] and navigated any
/// number of times. Every `navigate` call owns its own stack and working
/// collections, so a path can be shared between threads.
///
/// ```
/// use soy_core::ElementKind;
/// use soy_core::ElementPath;
/// use soy_core::ElementSpec;
/// use soy_core::NodeRef;
/// use soy_core::Predicate;
/// use soy_core::SyntaxTree;
///
/// let mut tree = SyntaxTree::new();
/// let file = tree.build_node(ElementKind::SoyFile, None, &ElementSpec::default()).unwrap();
/// let pair = tree.build_node(ElementKind::TemplateTagPair, Some(file), &ElementSpec::default()).unwrap();
/// tree.build_node(ElementKind::TemplateTag, Some(pair), &ElementSpec::named(".hello")).unwrap();
///
/// let path = ElementPath::<NodeRef<'_>>::builder()
/// 	.children(Predicate::kind(ElementKind::TemplateTagPair))
/// 	.children(Predicate::kind(ElementKind::TemplateTag))
/// 	.build()
/// 	.unwrap();
///
/// let root = tree.root().unwrap();
/// let found = path.navigate(&root);
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Clone)]
pub struct ElementPath<N: TreeNode> {
	program: Program<N>,
	traverse_empty: TraverseEmpty,
	label: Option<String>,
}

impl<N: TreeNode> ElementPath<N> {
	pub fn builder() -> PathBuilder<N> {
		PathBuilder::default()
	}

	/// A path that returns its start unchanged.
	pub fn identity() -> Self {
		Self::from_program(Program::Steps(Arc::new(vec![])))
	}

	fn from_program(program: Program<N>) -> Self {
		Self {
			program,
			traverse_empty: TraverseEmpty::Stop,
			label: None,
		}
	}

	pub fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	pub fn traverse_empty(&self) -> TraverseEmpty {
		self.traverse_empty
	}

	/// Name this path in traces. Navigation results are unaffected.
	#[must_use]
	pub fn debug(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	/// Union this path's results with `other`'s, keeping this path's
	/// results first.
	#[must_use]
	pub fn or(self, other: ElementPath<N>) -> Self {
		Self::from_program(Program::Or(vec![self, other]))
	}

	/// Drop anything `other` finds from the same start.
	#[must_use]
	pub fn exclude(self, other: ElementPath<N>) -> Self {
		Self::from_program(Program::Exclude {
			base: Box::new(self),
			excluded: vec![other],
		})
	}

	/// Continue navigating with `next` from this path's results.
	#[must_use]
	pub fn append(self, next: ElementPath<N>) -> Self {
		Self::from_program(Program::Append(vec![self, next]))
	}

	pub fn navigate(&self, start: &N) -> NodeCollection<N> {
		self.run(&NodeCollection::singleton(start.clone()))
	}

	pub fn navigate_all(&self, start: impl IntoIterator<Item = N>) -> NodeCollection<N> {
		self.run(&start.into_iter().collect())
	}

	fn run(&self, start: &NodeCollection<N>) -> NodeCollection<N> {
		let Some(label) = self.label.as_deref() else {
			return self.execute(start);
		};

		let span = tracing::debug_span!("path", label);
		let _entered = span.enter();
		tracing::debug!(start = start.len(), "begin path");
		let result = self.execute(start);
		tracing::debug!(found = result.len(), "end path");

		result
	}

	fn execute(&self, start: &NodeCollection<N>) -> NodeCollection<N> {
		if start.is_empty() {
			return NodeCollection::new();
		}

		match &self.program {
			Program::Steps(steps) => self.execute_steps(steps, start),
			Program::Or(paths) => {
				let mut found = NodeCollection::new();
				for path in paths {
					found.extend(path.run(start));
				}
				found
			}
			Program::Exclude { base, excluded } => {
				let mut found = base.run(start);
				for path in excluded {
					if found.is_empty() {
						break;
					}
					found = found.without(&path.run(start));
				}
				found
			}
			Program::Append(paths) => {
				let mut found = start.clone();
				for path in paths {
					found = path.run(&found);
				}
				found
			}
		}
	}

	fn execute_steps(&self, steps: &[Step<N>], start: &NodeCollection<N>) -> NodeCollection<N> {
		let mut stack: Vec<NodeCollection<N>> = vec![];
		let mut current = start.clone();

		for (index, step) in steps.iter().enumerate() {
			if self.traverse_empty == TraverseEmpty::Stop
				&& current.is_empty()
				&& !step.reads_stack()
				&& stack.iter().all(|saved| saved.is_empty())
			{
				tracing::trace!(index, "stopped on an empty collection");
				return NodeCollection::new();
			}

			let before = current.len();
			current = self.apply(step, std::mem::take(&mut current), start, &mut stack);
			tracing::trace!(index, %step, before, after = current.len());
		}

		current
	}

	fn apply(
		&self,
		step: &Step<N>,
		current: NodeCollection<N>,
		start: &NodeCollection<N>,
		stack: &mut Vec<NodeCollection<N>>,
	) -> NodeCollection<N> {
		match step {
			Step::Filter { scope, predicate } => {
				let mut found = vec![];
				for node in &current {
					scope.collect(node, predicate, &mut found);
				}
				found.into_iter().collect()
			}
			Step::Push => {
				stack.push(current.clone());
				current
			}
			Step::PushMatching(predicate) => {
				stack.push(current.filtered(|node| predicate.test(node)));
				current.filtered(|node| !predicate.test(node))
			}
			Step::Swap => {
				let popped = self.pop(stack, step);
				stack.push(current);
				popped
			}
			Step::Pop => self.pop(stack, step),
			Step::PopAdd => {
				let mut popped = self.pop(stack, step);
				popped.extend(current);
				popped
			}
			Step::PopAndJoin { join, .. } => {
				let popped = self.pop(stack, step);
				join(&current, &popped)
			}
			Step::Restart => start.clone(),
			Step::Fork(path) => {
				let mut found = NodeCollection::new();
				for node in current {
					found.extend(path.run(&NodeCollection::singleton(node)));
				}
				found
			}
			Step::Log(label) => {
				tracing::debug!(label = label.as_str(), nodes = ?current.to_vec(), "log elements");
				current
			}
		}
	}

	/// Built paths are balanced, so an empty stack here is a broken
	/// invariant rather than bad input.
	fn pop(&self, stack: &mut Vec<NodeCollection<N>>, step: &Step<N>) -> NodeCollection<N> {
		match stack.pop() {
			Some(popped) => popped,
			None => {
				panic!(
					"path `{}` ran `{step}` with nothing pushed",
					self.label().unwrap_or("anonymous")
				)
			}
		}
	}
}

impl<N: TreeNode> Debug for ElementPath<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut debug = f.debug_struct("ElementPath");
		debug.field("label", &self.label);
		debug.field("traverse_empty", &self.traverse_empty);
		match &self.program {
			Program::Steps(steps) => {
				let steps: Vec<String> = steps.iter().map(ToString::to_string).collect();
				debug.field("steps", &steps);
			}
			Program::Or(paths) => {
				debug.field("or", paths);
			}
			Program::Exclude { base, excluded } => {
				debug.field("base", base);
				debug.field("exclude", excluded);
			}
			Program::Append(paths) => {
				debug.field("append", paths);
			}
		}
		debug.finish()
	}
}

/// Collects the steps of an [`ElementPath`]. Stack balance and traversal
/// arguments are checked by [`PathBuilder::build`].
pub struct PathBuilder<N: TreeNode> {
	steps: Vec<Step<N>>,
	traverse_empty: TraverseEmpty,
	label: Option<String>,
}

impl<N: TreeNode> Default for PathBuilder<N> {
	fn default() -> Self {
		Self {
			steps: vec![],
			traverse_empty: TraverseEmpty::default(),
			label: None,
		}
	}
}

impl<N: TreeNode> PathBuilder<N> {
	#[must_use]
	pub fn filter(mut self, scope: Scope, predicate: Predicate<N>) -> Self {
		self.steps.push(Step::Filter { scope, predicate });
		self
	}

	/// Keep the nodes of the working collection that match.
	#[must_use]
	pub fn keep(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::SelfOnly, predicate)
	}

	#[must_use]
	pub fn children(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::Children, predicate)
	}

	#[must_use]
	pub fn children_of_children(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::ChildrenOfChildren, predicate)
	}

	#[must_use]
	pub fn first_child(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::FirstChild, predicate)
	}

	#[must_use]
	pub fn descendants(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::Descendants, predicate)
	}

	#[must_use]
	pub fn descendants_within(self, predicate: Predicate<N>, from: usize, to: usize) -> Self {
		self.filter(Scope::DescendantsWithin { from, to }, predicate)
	}

	#[must_use]
	pub fn parent(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::Parent, predicate)
	}

	#[must_use]
	pub fn ancestors(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::Ancestors, predicate)
	}

	#[must_use]
	pub fn first_ancestor(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::FirstAncestor, predicate)
	}

	#[must_use]
	pub fn next_sibling(self, predicate: Predicate<N>) -> Self {
		self.filter(Scope::NextSibling, predicate)
	}

	#[must_use]
	pub fn previous_siblings(self, predicate: Predicate<N>, include_self: bool) -> Self {
		self.filter(Scope::PreviousSiblings { include_self }, predicate)
	}

	#[must_use]
	pub fn next_siblings(self, predicate: Predicate<N>, include_self: bool) -> Self {
		self.filter(Scope::NextSiblings { include_self }, predicate)
	}

	#[must_use]
	pub fn push(mut self) -> Self {
		self.steps.push(Step::Push);
		self
	}

	#[must_use]
	pub fn push_matching(mut self, predicate: Predicate<N>) -> Self {
		self.steps.push(Step::PushMatching(predicate));
		self
	}

	#[must_use]
	pub fn swap(mut self) -> Self {
		self.steps.push(Step::Swap);
		self
	}

	#[must_use]
	pub fn pop(mut self) -> Self {
		self.steps.push(Step::Pop);
		self
	}

	#[must_use]
	pub fn pop_add(mut self) -> Self {
		self.steps.push(Step::PopAdd);
		self
	}

	/// Pop the last pushed collection and replace the working collection
	/// with `join(current, popped)`.
	#[must_use]
	pub fn pop_and_join(
		mut self,
		label: impl Into<String>,
		join: impl Fn(&NodeCollection<N>, &NodeCollection<N>) -> NodeCollection<N> + Send + Sync + 'static,
	) -> Self {
		self.steps.push(Step::PopAndJoin {
			label: label.into(),
			join: Arc::new(join),
		});
		self
	}

	#[must_use]
	pub fn restart(mut self) -> Self {
		self.steps.push(Step::Restart);
		self
	}

	#[must_use]
	pub fn fork(mut self, path: ElementPath<N>) -> Self {
		self.steps.push(Step::Fork(path));
		self
	}

	#[must_use]
	pub fn log(mut self, label: impl Into<String>) -> Self {
		self.steps.push(Step::Log(label.into()));
		self
	}

	/// Append the steps of `next`. Its label and empty policy are dropped.
	#[must_use]
	pub fn then(mut self, next: PathBuilder<N>) -> Self {
		self.steps.extend(next.steps);
		self
	}

	#[must_use]
	pub fn traverse_empty(mut self, policy: TraverseEmpty) -> Self {
		self.traverse_empty = policy;
		self
	}

	#[must_use]
	pub fn debug(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	/// Check the program and freeze it into a path.
	pub fn build(self) -> SoyResult<ElementPath<N>> {
		let label = self.label.as_deref().unwrap_or("anonymous");
		let unbalanced = |reason: String| {
			SoyError::UnbalancedPath {
				label: label.to_string(),
				reason,
			}
		};

		let mut depth = 0_usize;
		for (index, step) in self.steps.iter().enumerate() {
			match step {
				Step::Filter { scope, .. } => scope.validate()?,
				Step::Push | Step::PushMatching(_) => depth += 1,
				Step::Swap => {
					if depth == 0 {
						return Err(unbalanced(format!("step {index} `{step}` has nothing to swap with")));
					}
				}
				Step::Pop | Step::PopAdd | Step::PopAndJoin { .. } => {
					if depth == 0 {
						return Err(unbalanced(format!("step {index} `{step}` pops an empty stack")));
					}
					depth -= 1;
				}
				Step::Restart | Step::Fork(_) | Step::Log(_) => {}
			}
		}

		if depth > 0 {
			return Err(unbalanced(format!("{depth} pushed collection(s) never popped")));
		}

		Ok(ElementPath {
			program: Program::Steps(Arc::new(self.steps)),
			traverse_empty: self.traverse_empty,
			label: self.label,
		})
	}
}
