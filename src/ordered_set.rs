//! Insertion-ordered set used wherever ranking or probe order must be reproducible.

use std::collections::HashSet;

/// Sequence of unique values that remembers first-seen order.
///
/// Membership is decided on a key derived from each value, so the same type
/// can dedupe exactly (`OrderedSet::new`) or case-insensitively
/// (`OrderedSet::case_insensitive`).
#[derive(Debug, Clone)]
pub struct OrderedSet<T> {
    items: Vec<T>,
    index: HashSet<String>,
    key_fn: fn(&T) -> String,
}

fn exact_key<T: AsRef<str>>(value: &T) -> String {
    value.as_ref().to_string()
}

fn lowercase_key<T: AsRef<str>>(value: &T) -> String {
    value.as_ref().to_lowercase()
}

impl<T: AsRef<str>> OrderedSet<T> {
    pub fn new() -> Self {
        Self::with_key(exact_key::<T>)
    }

    pub fn case_insensitive() -> Self {
        Self::with_key(lowercase_key::<T>)
    }
}

impl<T: AsRef<str>> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedSet<T> {
    pub fn with_key(key_fn: fn(&T) -> String) -> Self {
        Self {
            items: Vec::new(),
            index: HashSet::new(),
            key_fn,
        }
    }

    /// Appends `value` unless an equal key is already present. Returns `true` if inserted.
    pub fn insert(&mut self, value: T) -> bool {
        let key = (self.key_fn)(&value);
        if !self.index.insert(key) {
            return false;
        }
        self.items.push(value);
        true
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, value: &T) -> bool {
        self.index.contains(&(self.key_fn)(value))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[cfg(test)]
    pub(crate) fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Extend<T> for OrderedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T> IntoIterator for OrderedSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
