use std::hash::Hash;

use derive_more::Deref;
use derive_more::DerefMut;
use indexmap::IndexSet;

/// The result of navigating an [`ElementPath`](crate::ElementPath): nodes
/// in the order they were first reached, each at most once.
#[derive(Debug, Clone, PartialEq, Eq, Deref, DerefMut)]
pub struct NodeCollection<N: Hash + Eq>(IndexSet<N>);

impl<N: Hash + Eq> Default for NodeCollection<N> {
	fn default() -> Self {
		Self(IndexSet::new())
	}
}

impl<N: Hash + Eq + Clone> NodeCollection<N> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn singleton(node: N) -> Self {
		std::iter::once(node).collect()
	}

	/// The only node, or `None` when there are zero or several.
	pub fn one_or_null(&self) -> Option<&N> {
		if self.0.len() == 1 { self.0.first() } else { None }
	}

	/// Keep the nodes that pass `test`, preserving order.
	#[must_use]
	pub fn filtered(&self, mut test: impl FnMut(&N) -> bool) -> Self {
		self.0.iter().filter(|node| test(node)).cloned().collect()
	}

	/// Nodes of `self` that are not in `other`, preserving order.
	#[must_use]
	pub fn without(&self, other: &Self) -> Self {
		self.filtered(|node| !other.contains(node))
	}

	pub fn to_vec(&self) -> Vec<N> {
		self.0.iter().cloned().collect()
	}
}

impl<N: Hash + Eq> FromIterator<N> for NodeCollection<N> {
	fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl<N: Hash + Eq> Extend<N> for NodeCollection<N> {
	fn extend<I: IntoIterator<Item = N>>(&mut self, iter: I) {
		self.0.extend(iter);
	}
}

impl<N: Hash + Eq> IntoIterator for NodeCollection<N> {
	type IntoIter = indexmap::set::IntoIter<N>;
	type Item = N;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'c, N: Hash + Eq> IntoIterator for &'c NodeCollection<N> {
	type IntoIter = indexmap::set::Iter<'c, N>;
	type Item = &'c N;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
