//! Declarative extraction of archive XML trees
//!
//! Every domain entity is built the same way: bind the names of the child
//! elements it needs to the fields they populate, run a single
//! [`SchemaTable::search`] over the node, drop the fields that may be absent,
//! and fail if anything required is still pending.
//!
//! ```
//! use tomodicom_core::schema::SchemaTable;
//!
//! let doc = roxmltree::Document::parse("<color><red>1</red><green>2</green></color>").unwrap();
//! let root = doc.root_element();
//!
//! let (mut red, mut green, mut blue) = (0i32, 0i32, 0i32);
//! let mut table = SchemaTable::new();
//! table.bind("red", &mut red);
//! table.bind("green", &mut green);
//! table.bind("blue", &mut blue);
//! table.search(root).unwrap();
//!
//! assert_eq!(table.remaining_count(), 1);
//! assert!(table.finish(root).is_err());
//! ```

use crate::error::{Result, TomoError};
use log::warn;
use roxmltree::Node;
use std::str::FromStr;

/// Construction contract for entities built from an XML subtree
pub trait FromNode: Sized {
    /// Builds the entity from `node`, which is the element bound to it
    fn from_node(node: Node<'_, '_>) -> Result<Self>;
}

type Reader<'t> = Box<dyn FnMut(Node<'_, '_>) -> Result<()> + 't>;

/// Target of a single name binding
pub enum Binding<'t> {
    Int(&'t mut i32),
    Bool(&'t mut bool),
    Float(&'t mut f32),
    Double(&'t mut f64),
    Text(&'t mut String),
    /// A subtree built through its own [`FromNode`] contract
    Nested(Reader<'t>),
    /// Every same-named child of the bound node, one element each
    List(Reader<'t>),
}

impl<'t> Binding<'t> {
    /// Binding for a nested entity
    pub fn nested<T: FromNode>(target: &'t mut T) -> Self {
        Binding::Nested(Box::new(move |node: Node<'_, '_>| {
            *target = T::from_node(node)?;
            Ok(())
        }))
    }

    /// Binding for a homogeneous list
    ///
    /// The bound node is the list container. Its children named `item` are
    /// constructed in document order; an empty result is an error.
    pub fn list<T: FromNode>(target: &'t mut Vec<T>, item: &str) -> Self {
        let item = item.to_string();
        Binding::List(Box::new(move |node: Node<'_, '_>| {
            target.clear();
            for child in node.children().filter(|c| c.has_tag_name(item.as_str())) {
                target.push(T::from_node(child)?);
            }
            if target.is_empty() {
                return Err(TomoError::DomainInvariant(format!(
                    "Array list {} is empty",
                    node.tag_name().name()
                )));
            }
            Ok(())
        }))
    }

    fn read(&mut self, node: Node<'_, '_>) -> Result<()> {
        match self {
            Binding::Int(x) => **x = parse_scalar(node)?,
            Binding::Float(x) => **x = parse_scalar(node)?,
            Binding::Double(x) => **x = parse_scalar(node)?,
            Binding::Bool(x) => **x = parse_bool(node)?,
            Binding::Text(x) => **x = text(node),
            Binding::Nested(reader) | Binding::List(reader) => reader(node)?,
        }
        Ok(())
    }
}

impl<'t> From<&'t mut i32> for Binding<'t> {
    fn from(x: &'t mut i32) -> Self {
        Binding::Int(x)
    }
}

impl<'t> From<&'t mut bool> for Binding<'t> {
    fn from(x: &'t mut bool) -> Self {
        Binding::Bool(x)
    }
}

impl<'t> From<&'t mut f32> for Binding<'t> {
    fn from(x: &'t mut f32) -> Self {
        Binding::Float(x)
    }
}

impl<'t> From<&'t mut f64> for Binding<'t> {
    fn from(x: &'t mut f64) -> Self {
        Binding::Double(x)
    }
}

impl<'t> From<&'t mut String> for Binding<'t> {
    fn from(x: &'t mut String) -> Self {
        Binding::Text(x)
    }
}

/// Table of pending name bindings for one tree level
///
/// Bindings are kept in insertion order so that missing-field reports are
/// stable. A binding is consumed the first time its name is matched and is
/// never matched again by the same table.
#[derive(Default)]
pub struct SchemaTable<'t> {
    pending: Vec<(String, Binding<'t>)>,
}

impl<'t> SchemaTable<'t> {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Registers a scalar or prebuilt binding under `name`
    ///
    /// Re-binding a pending name replaces the earlier target.
    pub fn bind(&mut self, name: &str, target: impl Into<Binding<'t>>) -> &mut Self {
        let target = target.into();
        match self.pending.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = target,
            None => self.pending.push((name.to_string(), target)),
        }
        self
    }

    /// Registers a nested entity under `name`
    pub fn bind_object<T: FromNode>(&mut self, name: &str, target: &'t mut T) -> &mut Self {
        self.bind(name, Binding::nested(target))
    }

    /// Registers a list under `name`; its items carry the same name
    pub fn bind_list<T: FromNode>(&mut self, name: &str, target: &'t mut Vec<T>) -> &mut Self {
        self.bind(name, Binding::list(target, name))
    }

    /// Runs one pass over the element children of `node`
    ///
    /// Each child whose name matches a pending binding is read into its
    /// target, and the binding is removed.
    pub fn search(&mut self, node: Node<'_, '_>) -> Result<()> {
        for child in node.children().filter(Node::is_element) {
            let name = child.tag_name().name();
            if let Some(pos) = self.pending.iter().position(|(key, _)| key == name) {
                let (_, mut binding) = self.pending.remove(pos);
                binding.read(child)?;
            }
        }
        Ok(())
    }

    /// Number of bindings that have not been matched yet
    pub fn remaining_count(&self) -> usize {
        self.pending.len()
    }

    /// Names of the bindings that have not been matched yet
    pub fn remaining(&self) -> Vec<String> {
        self.pending.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Drops an optional binding
    ///
    /// Returns `true` if the field was still pending, i.e. absent from the
    /// searched node. With `warn_if_missing`, an absent field is logged.
    pub fn remove_optional(&mut self, node: Node<'_, '_>, name: &str, warn_if_missing: bool) -> bool {
        match self.pending.iter().position(|(key, _)| key == name) {
            Some(pos) => {
                self.pending.remove(pos);
                if warn_if_missing {
                    warn!("Tree {} is missing key {}", node.tag_name().name(), name);
                }
                true
            }
            None => false,
        }
    }

    /// Fails with [`TomoError::MissingFields`] if any binding is still pending
    pub fn finish(self, node: Node<'_, '_>) -> Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(TomoError::MissingFields {
                node: node.tag_name().name().to_string(),
                fields: self.remaining(),
            })
        }
    }
}

/// Required single child of `node`
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .ok_or_else(|| TomoError::missing(node.tag_name().name(), name))
}

/// Trimmed text content of `node`, empty if it has none
pub fn text(node: Node<'_, '_>) -> String {
    node.text().map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Parses the text of `node` as a number; empty text reads as zero
pub fn parse_scalar<T: FromStr + Default>(node: Node<'_, '_>) -> Result<T> {
    let value = text(node);
    if value.is_empty() {
        return Ok(T::default());
    }
    value.parse().map_err(|_| {
        TomoError::DomainInvariant(format!(
            "Invalid numeric value {:?} in {}",
            value,
            node.tag_name().name()
        ))
    })
}

fn parse_bool(node: Node<'_, '_>) -> Result<bool> {
    let value = text(node).to_lowercase();
    match value.as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(TomoError::DomainInvariant(format!(
            "Invalid boolean value {:?} in {}",
            value,
            node.tag_name().name()
        ))),
    }
}

/// Reads a fixed-length numeric array from the element children of `node`
pub fn parse_array<T: FromStr + Default + Copy, const N: usize>(node: Node<'_, '_>) -> Result<[T; N]> {
    let values = node
        .children()
        .filter(Node::is_element)
        .map(|c| parse_scalar(c))
        .collect::<Result<Vec<T>>>()?;
    values.try_into().map_err(|v: Vec<T>| {
        TomoError::DomainInvariant(format!(
            "Extracted {} elements for array {}; expected {}",
            v.len(),
            node.tag_name().name(),
            N
        ))
    })
}
