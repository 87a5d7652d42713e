//! Symbol table: scopes holding variables and nested struct scopes, each kept
//! in an unbalanced binary search tree keyed by name.
//!
//! Trees live in an arena (`Vec` plus index links), so a scope owns its whole
//! subtree and dropping the scope drops everything below it. Insertion order
//! decides the shape: sorted insertions degenerate into a list, and lookups
//! become linear. That is accepted, not rebalanced.

use std::cell::Cell;
use std::cmp::Ordering;
use thiserror::Error;

use crate::numeric::NumericError;
use crate::value::{Kind, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("name '{name}' is already declared")]
pub struct NameCollision {
    pub name: String,
}

pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug)]
struct Node<T> {
    item: T,
    lower: Option<usize>,
    upper: Option<usize>,
}

#[derive(Debug)]
pub struct NameTree<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Default for NameTree<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T: Named> NameTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks from the root, going to the lower branch for smaller names and
    /// the upper branch for larger ones, and attaches the item at the first
    /// empty slot.
    pub fn insert(&mut self, item: T) -> Result<&mut T, NameCollision> {
        let new_index = self.nodes.len();
        if self.nodes.is_empty() {
            self.nodes.push(Node {
                item,
                lower: None,
                upper: None,
            });
            return Ok(&mut self.nodes[new_index].item);
        }

        let mut current = 0;
        loop {
            let node = &self.nodes[current];
            let ordering = item.name().cmp(node.item.name());
            let next = match ordering {
                Ordering::Equal => {
                    return Err(NameCollision {
                        name: item.name().to_string(),
                    })
                }
                Ordering::Less => node.lower,
                Ordering::Greater => node.upper,
            };

            match next {
                Some(index) => current = index,
                None => {
                    self.nodes.push(Node {
                        item,
                        lower: None,
                        upper: None,
                    });
                    let parent = &mut self.nodes[current];
                    if ordering == Ordering::Less {
                        parent.lower = Some(new_index);
                    } else {
                        parent.upper = Some(new_index);
                    }
                    return Ok(&mut self.nodes[new_index].item);
                }
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        let mut current = if self.nodes.is_empty() { None } else { Some(0) };
        while let Some(index) = current {
            let node = &self.nodes[index];
            current = match name.cmp(node.item.name()) {
                Ordering::Equal => return Some(index),
                Ordering::Less => node.lower,
                Ordering::Greater => node.upper,
            };
        }
        None
    }

    pub fn find(&self, name: &str) -> Option<&T> {
        self.position(name).map(|index| &self.nodes[index].item)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut T> {
        match self.position(name) {
            Some(index) => Some(&mut self.nodes[index].item),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut height = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[index];
            for child in [node.lower, node.upper].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        height
    }

    /// Items in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut current = if self.nodes.is_empty() { None } else { Some(0) };
        while current.is_some() || !stack.is_empty() {
            while let Some(index) = current {
                stack.push(index);
                current = self.nodes[index].lower;
            }
            if let Some(index) = stack.pop() {
                ordered.push(&self.nodes[index].item);
                current = self.nodes[index].upper;
            }
        }
        ordered.into_iter()
    }
}

/// Storage owned by the host and shared with a script variable.
///
/// Every read or write is a single `Cell::get`/`Cell::set`; the parser never
/// keeps a copy of the value.
#[derive(Debug, Clone, Copy)]
pub enum ExternalRef<'h> {
    Bool(&'h Cell<bool>),
    Byte(&'h Cell<u8>),
    Int(&'h Cell<i32>),
    Int64(&'h Cell<i64>),
    Float(&'h Cell<f32>),
    Double(&'h Cell<f64>),
}

impl<'h> ExternalRef<'h> {
    pub fn kind(&self) -> Kind {
        match self {
            ExternalRef::Bool(_) => Kind::Bool,
            ExternalRef::Byte(_) => Kind::Byte,
            ExternalRef::Int(_) => Kind::Int,
            ExternalRef::Int64(_) => Kind::Int64,
            ExternalRef::Float(_) => Kind::Float,
            ExternalRef::Double(_) => Kind::Double,
        }
    }

    fn get(&self) -> Value {
        match self {
            ExternalRef::Bool(cell) => Value::Bool(cell.get()),
            ExternalRef::Byte(cell) => Value::Byte(cell.get()),
            ExternalRef::Int(cell) => Value::Int(cell.get()),
            ExternalRef::Int64(cell) => Value::Int64(cell.get()),
            ExternalRef::Float(cell) => Value::Float(cell.get()),
            ExternalRef::Double(cell) => Value::Double(cell.get()),
        }
    }

    // The value must already have this reference's kind.
    fn set(&self, value: Value) {
        match (self, value) {
            (ExternalRef::Bool(cell), Value::Bool(v)) => cell.set(v),
            (ExternalRef::Byte(cell), Value::Byte(v)) => cell.set(v),
            (ExternalRef::Int(cell), Value::Int(v)) => cell.set(v),
            (ExternalRef::Int64(cell), Value::Int64(v)) => cell.set(v),
            (ExternalRef::Float(cell), Value::Float(v)) => cell.set(v),
            (ExternalRef::Double(cell), Value::Double(v)) => cell.set(v),
            (reference, value) => {
                debug_assert!(false, "{:?} written with {:?}", reference.kind(), value.kind());
            }
        }
    }
}

#[derive(Debug)]
pub enum Storage<'h> {
    Owned(Value),
    External(ExternalRef<'h>),
}

#[derive(Debug)]
pub struct Variable<'h> {
    name: String,
    storage: Storage<'h>,
}

impl<'h> Variable<'h> {
    pub fn owned(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            storage: Storage::Owned(value),
        }
    }

    pub fn external(name: &str, reference: ExternalRef<'h>) -> Self {
        Self {
            name: name.to_string(),
            storage: Storage::External(reference),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        match &self.storage {
            Storage::Owned(value) => value.kind(),
            Storage::External(reference) => reference.kind(),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.storage, Storage::External(_))
    }

    pub fn value(&self) -> Value {
        match &self.storage {
            Storage::Owned(value) => *value,
            Storage::External(reference) => reference.get(),
        }
    }

    pub fn as_double(&self) -> f64 {
        self.value().as_double()
    }

    /// Stores `value` keeping the variable's kind, through an implicit cast.
    /// Returns the value actually stored.
    pub fn assign(&mut self, value: Value) -> Result<Value, NumericError> {
        let kind = self.kind();
        let converted = value
            .cast_implicit(kind)
            .ok_or(NumericError::ImplicitCast {
                from: value.kind(),
                to: kind,
            })?;
        match &mut self.storage {
            Storage::Owned(slot) => *slot = converted,
            Storage::External(reference) => reference.set(converted),
        }
        Ok(converted)
    }

    /// Stores `value` re-typing owned storage to the value's kind. Host-bound
    /// storage cannot change kind and falls back to [`Variable::assign`].
    pub fn assign_dynamic(&mut self, value: Value) -> Result<Value, NumericError> {
        if let Storage::Owned(slot) = &mut self.storage {
            *slot = value;
            return Ok(value);
        }
        self.assign(value)
    }
}

impl Named for Variable<'_> {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A named symbol table. The global scope is the unnamed root; `struct`
/// declarations create nested scopes. Name resolution never looks outward.
#[derive(Debug, Default)]
pub struct Scope<'h> {
    name: String,
    variables: NameTree<Variable<'h>>,
    structs: NameTree<Scope<'h>>,
}

impl<'h> Scope<'h> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variables: NameTree::new(),
            structs: NameTree::new(),
        }
    }

    pub fn global() -> Self {
        Self::new("")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a zero-initialised variable of `kind`.
    pub fn declare(&mut self, name: &str, kind: Kind) -> Result<&mut Variable<'h>, NameCollision> {
        self.declare_value(name, kind.zero())
    }

    pub fn declare_value(&mut self, name: &str, value: Value) -> Result<&mut Variable<'h>, NameCollision> {
        self.variables.insert(Variable::owned(name, value))
    }

    pub fn bind_external(
        &mut self,
        name: &str,
        reference: ExternalRef<'h>,
    ) -> Result<&mut Variable<'h>, NameCollision> {
        self.variables.insert(Variable::external(name, reference))
    }

    pub fn find(&self, name: &str) -> Option<&Variable<'h>> {
        self.variables.find(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Variable<'h>> {
        self.variables.find_mut(name)
    }

    /// Registers a fully built struct scope under its own name.
    pub fn declare_struct(&mut self, structure: Scope<'h>) -> Result<&mut Scope<'h>, NameCollision> {
        self.structs.insert(structure)
    }

    pub fn find_struct(&self, name: &str) -> Option<&Scope<'h>> {
        self.structs.find(name)
    }

    pub fn variables(&self) -> &NameTree<Variable<'h>> {
        &self.variables
    }

    pub fn structs(&self) -> &NameTree<Scope<'h>> {
        &self.structs
    }
}

impl Named for Scope<'_> {
    fn name(&self) -> &str {
        &self.name
    }
}
