//! Tree builder.
//!
//! Normalizes nested child arguments into a `VNode`: arbitrarily nested
//! lists flatten into one ordered sequence, boolean/null leaves drop
//! out, and for host-tag targets adjacent primitive leaves coalesce
//! into a single text child (numbers stringified). Component targets
//! keep children distinct. A configured extension hook receives every
//! constructed node.

use std::rc::Rc;

use crate::accessor::{CHILDREN_PROP, KEY_ATTR};
use crate::props::PropMap;
use crate::value::{fmt_number, Value};
use crate::vnode::{VChild, VName, VNode};

/// One child argument, before normalization.
#[derive(Clone, Debug)]
pub enum Child {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Node(VNode),
    List(Vec<Child>),
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(s.to_string())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(s)
    }
}

impl From<i64> for Child {
    fn from(i: i64) -> Self {
        Child::Int(i)
    }
}

impl From<i32> for Child {
    fn from(i: i32) -> Self {
        Child::Int(i as i64)
    }
}

impl From<f64> for Child {
    fn from(f: f64) -> Self {
        Child::Float(f)
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Bool(b)
    }
}

impl From<VNode> for Child {
    fn from(n: VNode) -> Self {
        Child::Node(n)
    }
}

impl From<Vec<Child>> for Child {
    fn from(list: Vec<Child>) -> Self {
        Child::List(list)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Child::None,
        }
    }
}

/// Builds virtual nodes, invoking the configured vnode hook on each.
#[derive(Clone, Default)]
pub struct TreeBuilder {
    pub vnode_hook: Option<Rc<dyn Fn(&mut VNode)>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a `VNode` from a target, attributes and children.
    pub fn build(
        &self,
        name: impl Into<VName>,
        mut attributes: PropMap,
        children: Vec<Child>,
    ) -> VNode {
        let name = name.into();
        let is_tag = !name.is_component();

        // an embedded children prop is the child source only when no
        // explicit children were supplied; it is consumed either way
        let embedded = attributes.remove(CHILDREN_PROP);
        let source = if children.is_empty() {
            match embedded {
                Some(Value::Nodes(nodes)) => nodes
                    .into_iter()
                    .map(|c| match c {
                        VChild::Text(t) => Child::Text(t),
                        VChild::Node(n) => Child::Node(n),
                    })
                    .collect(),
                Some(Value::Str(s)) => vec![Child::Text(s)],
                _ => Vec::new(),
            }
        } else {
            children
        };

        let mut out: Vec<VChild> = Vec::new();
        let mut last_simple = false;

        let mut stack: Vec<Child> = source.into_iter().rev().collect();
        while let Some(child) = stack.pop() {
            match child {
                Child::List(list) => {
                    for item in list.into_iter().rev() {
                        stack.push(item);
                    }
                }
                Child::None | Child::Bool(_) => {
                    last_simple = false;
                }
                Child::Node(node) => {
                    out.push(VChild::Node(node));
                    last_simple = false;
                }
                Child::Text(text) => {
                    push_simple(&mut out, text, is_tag, &mut last_simple);
                }
                Child::Int(i) => {
                    push_simple(&mut out, i.to_string(), is_tag, &mut last_simple);
                }
                Child::Float(f) => {
                    push_simple(&mut out, fmt_number(f), is_tag, &mut last_simple);
                }
            }
        }

        let key = attributes.get(KEY_ATTR).map(Value::to_text);

        let mut vnode = VNode {
            name,
            attributes,
            children: out,
            key,
        };

        if let Some(hook) = &self.vnode_hook {
            hook(&mut vnode);
        }
        vnode
    }
}

fn push_simple(out: &mut Vec<VChild>, text: String, is_tag: bool, last_simple: &mut bool) {
    if is_tag && *last_simple {
        if let Some(VChild::Text(prev)) = out.last_mut() {
            prev.push_str(&text);
            return;
        }
    }
    out.push(VChild::Text(text));
    *last_simple = true;
}

/// Construct a `VNode` without an extension hook.
pub fn build(name: impl Into<VName>, attributes: PropMap, children: Vec<Child>) -> VNode {
    TreeBuilder::new().build(name, attributes, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentKind, Cx};
    use crate::props;

    #[derive(Default)]
    struct Widget;
    impl Component for Widget {
        fn render(&mut self, _cx: &mut Cx<'_>) -> Option<VNode> {
            None
        }
    }

    #[test]
    fn test_text_coalescing_for_tags() {
        let node = build(
            "div",
            PropMap::new(),
            vec!["a".into(), 1i64.into(), "b".into()],
        );
        assert_eq!(node.children, vec![VChild::Text("a1b".into())]);
    }

    #[test]
    fn test_components_keep_children_distinct() {
        let node = build(
            ComponentKind::of::<Widget>(),
            PropMap::new(),
            vec!["a".into(), 1i64.into(), "b".into()],
        );
        assert_eq!(
            node.children,
            vec![
                VChild::Text("a".into()),
                VChild::Text("1".into()),
                VChild::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_nested_lists_flatten_in_order() {
        let node = build(
            "div",
            PropMap::new(),
            vec![
                Child::List(vec![
                    build("i", PropMap::new(), vec![]).into(),
                    Child::List(vec![build("b", PropMap::new(), vec![]).into()]),
                ]),
                build("u", PropMap::new(), vec![]).into(),
            ],
        );
        let tags: Vec<String> = node
            .children
            .iter()
            .map(|c| match c {
                VChild::Node(n) => match &n.name {
                    VName::Tag(t) => t.clone(),
                    VName::Component(k) => k.name().to_string(),
                },
                VChild::Text(t) => t.clone(),
            })
            .collect();
        assert_eq!(tags, vec!["i", "b", "u"]);
    }

    #[test]
    fn test_drops_bool_and_none_leaves() {
        let node = build(
            "div",
            PropMap::new(),
            vec![
                true.into(),
                "a".into(),
                Child::None,
                false.into(),
                "b".into(),
            ],
        );
        // the dropped leaves also break coalescing runs
        assert_eq!(
            node.children,
            vec![VChild::Text("a".into()), VChild::Text("b".into())]
        );
    }

    #[test]
    fn test_children_prop_consumed_only_without_explicit_children() {
        let embedded = Value::Nodes(vec![VChild::Text("emb".into())]);

        let mut attrs = PropMap::new();
        attrs.set(CHILDREN_PROP, embedded.clone());
        let node = build("div", attrs, vec![]);
        assert_eq!(node.children, vec![VChild::Text("emb".into())]);
        assert!(!node.attributes.contains(CHILDREN_PROP));

        let mut attrs = PropMap::new();
        attrs.set(CHILDREN_PROP, embedded);
        let node = build("div", attrs, vec!["explicit".into()]);
        assert_eq!(node.children, vec![VChild::Text("explicit".into())]);
        assert!(!node.attributes.contains(CHILDREN_PROP));
    }

    #[test]
    fn test_key_lifted_from_attributes() {
        let node = build("li", props! { "key" => "k1", "id" => "x" }, vec![]);
        assert_eq!(node.key.as_deref(), Some("k1"));
        // the attribute itself stays visible to the attribute cache
        assert!(node.attributes.contains("key"));
    }

    #[test]
    fn test_vnode_hook_sees_every_node() {
        use std::cell::Cell;
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let builder = TreeBuilder {
            vnode_hook: Some(Rc::new(move |_| seen.set(seen.get() + 1))),
        };
        let inner = builder.build("span", PropMap::new(), vec![]);
        builder.build("div", PropMap::new(), vec![inner.into()]);
        assert_eq!(count.get(), 2);
    }
}
