//! Ordered container behind every parent/children relation of the map object graph.

use std::collections::TryReserveError;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Hook called with every element still stored in a list when the list is dropped.
pub type ElementDestructor<T> = Box<dyn FnMut(Rc<T>)>;

/// Ordered list of reference-counted elements.
///
/// Elements are stored as [`Rc`] handles, so an element pushed into several lists (or also held
/// by the caller) lives until its last owner lets it go. When the list is dropped, the optional
/// element destructor receives every remaining element exactly once, in insertion order.
///
/// Iterators borrow the list, so the list cannot be changed while it is being iterated.
///
/// ```
/// use std::rc::Rc;
/// use cartouche::SharedList;
///
/// let mut list: SharedList<&str> = SharedList::new();
/// let first = list.push("first").unwrap();
/// list.push("second").unwrap();
///
/// assert_eq!(list.len(), 2);
/// assert!(Rc::ptr_eq(list.head().unwrap(), &first));
/// assert_eq!(list.iter().map(|v| **v).collect::<Vec<_>>(), ["first", "second"]);
/// ```
pub struct SharedList<T> {
    items: Vec<Rc<T>>,
    destructor: Option<ElementDestructor<T>>,
}

impl<T> SharedList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            destructor: None,
        }
    }

    /// Appends an element and returns the stored handle. Fails only if the list cannot grow.
    pub fn push(&mut self, value: impl Into<Rc<T>>) -> Result<Rc<T>, TryReserveError> {
        self.items.try_reserve(1)?;
        let value = value.into();
        self.items.push(value.clone());
        Ok(value)
    }

    /// Removes the last element and returns it.
    pub fn pop(&mut self) -> Option<Rc<T>> {
        self.items.pop()
    }

    /// Element at `index`, or `None` outside of `[0, len)`.
    pub fn get(&self, index: usize) -> Option<&Rc<T>> {
        self.items.get(index)
    }

    /// First element.
    pub fn head(&self) -> Option<&Rc<T>> {
        self.items.first()
    }

    /// Last element.
    pub fn tail(&self) -> Option<&Rc<T>> {
        self.items.last()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Creates a forward iterator starting at the head of the list.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            position: 0,
        }
    }

    /// Sets the hook called for each remaining element when the list is dropped.
    pub fn set_element_destructor(&mut self, destructor: impl FnMut(Rc<T>) + 'static) {
        self.destructor = Some(Box::new(destructor));
    }
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SharedList<T> {
    fn drop(&mut self) {
        if let Some(mut destructor) = self.destructor.take() {
            for item in self.items.drain(..) {
                destructor(item);
            }
        }
    }
}

impl<T: Debug> Debug for SharedList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a SharedList<T> {
    type Item = &'a Rc<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward iterator over a [`SharedList`].
pub struct Iter<'a, T> {
    list: &'a SharedList<T>,
    position: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a Rc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.list.items.get(self.position)?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.list.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
