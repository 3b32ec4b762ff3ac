//! Attribute and prop values.
//!
//! Everything a virtual node can carry as an attribute - and everything
//! the host accessor knows how to apply - is a `Value`. Handlers and
//! refs are reference-counted so prop maps stay cheaply cloneable.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use graft_dom::NodeId;

use crate::engine::Engine;
use crate::event::Event;
use crate::instance::InstanceId;
use crate::vnode::VChild;

/// Event listener callback type.
pub type EventHandler = Rc<dyn Fn(&mut Event, &mut Engine)>;

/// Ref callback type.
pub type RefCallback = Rc<dyn Fn(Option<RefTarget>)>;

/// Attribute/prop value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Inline style, either a raw declaration string or a property map
    Style(Style),
    /// Raw markup injected in place of children
    Raw(String),
    /// Event listener
    Handler(EventHandler),
    /// External reference to the materialized node or instance
    Ref(RefSlot),
    /// Embedded children, as handed to components via their props
    Nodes(Vec<VChild>),
}

impl Value {
    /// Textual rendering, as written into host attributes.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => fmt_number(*f),
            Value::Str(s) => s.clone(),
            Value::Style(Style::Text(s)) => s.clone(),
            Value::Style(Style::Map(_)) | Value::Raw(_) | Value::Handler(_) | Value::Ref(_)
            | Value::Nodes(_) => String::new(),
        }
    }

    /// Null and `false` read as absent; empty strings count as falsy
    /// for raw-content purposes.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => false,
            Value::Str(s) | Value::Raw(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Whether the generic fallback treats this value as a removal.
    pub fn is_removal(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Style(a), Value::Style(b)) => a == b,
            (Value::Raw(a), Value::Raw(b)) => a == b,
            (Value::Handler(a), Value::Handler(b)) => Rc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => a.same(b),
            (Value::Nodes(a), Value::Nodes(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Style(s) => write!(f, "Style({s:?})"),
            Value::Raw(s) => write!(f, "Raw({s:?})"),
            Value::Handler(_) => write!(f, "Handler(..)"),
            Value::Ref(_) => write!(f, "Ref(..)"),
            Value::Nodes(n) => write!(f, "Nodes({n:?})"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Style> for Value {
    fn from(s: Style) -> Self {
        Value::Style(s)
    }
}

/// Inline style value.
#[derive(Clone, Debug, PartialEq)]
pub enum Style {
    /// A raw declaration string, applied wholesale
    Text(String),
    /// Ordered property map, diffed declaration by declaration
    Map(Vec<(String, StyleValue)>),
}

impl Style {
    pub fn map<I, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, StyleValue)>,
        N: Into<String>,
    {
        Style::Map(entries.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }
}

/// One style declaration value.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
    Str(String),
    /// Numeric values are suffixed with the length unit on application
    /// unless the property is a known unitless one
    Num(f64),
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        StyleValue::Str(s.to_string())
    }
}

impl From<f64> for StyleValue {
    fn from(n: f64) -> Self {
        StyleValue::Num(n)
    }
}

impl From<i32> for StyleValue {
    fn from(n: i32) -> Self {
        StyleValue::Num(n as f64)
    }
}

/// What a ref resolves to once its owner is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    Node(NodeId),
    Instance(InstanceId),
}

/// External reference slot: either a callback invoked on attach/detach
/// or a shared cell the runtime keeps up to date.
#[derive(Clone)]
pub enum RefSlot {
    Callback(RefCallback),
    Cell(Rc<RefCell<Option<RefTarget>>>),
}

impl RefSlot {
    /// Create a shared cell ref
    pub fn cell() -> (Self, Rc<RefCell<Option<RefTarget>>>) {
        let cell = Rc::new(RefCell::new(None));
        (RefSlot::Cell(cell.clone()), cell)
    }

    /// Create a callback ref
    pub fn callback(f: impl Fn(Option<RefTarget>) + 'static) -> Self {
        RefSlot::Callback(Rc::new(f))
    }

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (RefSlot::Callback(a), RefSlot::Callback(b)) => Rc::ptr_eq(a, b),
            (RefSlot::Cell(a), RefSlot::Cell(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Invoke or update a ref.
pub fn apply_ref(slot: Option<&RefSlot>, value: Option<RefTarget>) {
    match slot {
        Some(RefSlot::Callback(f)) => f(value),
        Some(RefSlot::Cell(cell)) => *cell.borrow_mut() = value,
        None => {}
    }
}

/// Format a float the way it reads in markup: integral values drop the
/// fractional part.
pub(crate) fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(fmt_number(1.0), "1");
        assert_eq!(fmt_number(20.0), "20");
        assert_eq!(fmt_number(1.5), "1.5");
        assert_eq!(Value::Int(7).to_text(), "7");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(Value::Int(0).is_truthy());
    }

    #[test]
    fn test_handler_equality_is_identity() {
        let a: EventHandler = Rc::new(|_, _| {});
        let b: EventHandler = Rc::new(|_, _| {});
        assert_eq!(Value::Handler(a.clone()), Value::Handler(a.clone()));
        assert_ne!(Value::Handler(a), Value::Handler(b));
    }

    #[test]
    fn test_ref_cell_updates() {
        let mut dom = graft_dom::DomTree::new();
        let node = dom.create_element("div", false);

        let (slot, cell) = RefSlot::cell();
        apply_ref(Some(&slot), Some(RefTarget::Node(node)));
        assert_eq!(*cell.borrow(), Some(RefTarget::Node(node)));
        apply_ref(Some(&slot), None);
        assert!(cell.borrow().is_none());
    }
}
