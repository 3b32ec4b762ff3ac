//! Edge cases for the reconciler: idempotent re-diffs, keyed child
//! matching, hydration against externally created trees, attribute and
//! style patching, namespaces, and environment quirks.

use std::cell::RefCell;

use graft::{
    build, props, Component, ComponentKind, Cx, DomError, Engine, NodeId, PropMap, PropertyValue,
    RenderError, Style, StyleValue, Value, VNode, RAW_MARKUP_ATTR,
};

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn log(entry: impl Into<String>) {
    LOG.with(|l| l.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
    LOG.with(|l| l.borrow_mut().drain(..).collect())
}

fn body(engine: &mut Engine) -> NodeId {
    engine.dom.create_element("body", false)
}

fn keyed_list(order: &[(&str, &str)]) -> VNode {
    let items = order
        .iter()
        .map(|(key, text)| {
            build("li", props! { "key" => *key }, vec![(*text).into()]).into()
        })
        .collect();
    build("ul", PropMap::new(), items)
}

// ---------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------

#[test]
fn test_rediffing_synchronized_tree_mutates_nothing() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let make = || {
        build(
            "div",
            props! {
                "id" => "app",
                "class" => "main",
                "style" => Style::map([("width", StyleValue::Num(10.0))]),
            },
            vec![
                build("span", props! { "title" => "x" }, vec!["a".into()]).into(),
                "plain".into(),
                build("span", PropMap::new(), vec!["b".into()]).into(),
            ],
        )
    };

    let root = engine.render(make(), container).unwrap();
    let baseline = engine.dom.mutation_count();

    let root2 = engine.render_over(make(), container, Some(root)).unwrap();
    assert_eq!(root2, root);
    assert_eq!(
        engine.dom.mutation_count(),
        baseline,
        "re-diffing an already-synchronized tree must not mutate the host"
    );
}

// ---------------------------------------------------------------------
// Keyed children
// ---------------------------------------------------------------------

#[test]
fn test_keyed_reorder_preserves_identity() {
    let mut engine = Engine::new();
    let container = body(&mut engine);

    let root = engine
        .render(keyed_list(&[("a", "A"), ("b", "B"), ("c", "C")]), container)
        .unwrap();
    let before = engine.dom.children(root);
    let baseline = engine.dom.mutation_count();

    engine
        .render_over(keyed_list(&[("c", "C"), ("a", "A"), ("b", "B")]), container, Some(root))
        .unwrap();
    let after = engine.dom.children(root);

    assert_eq!(after, vec![before[2], before[0], before[1]], "no recreation");
    assert_eq!(
        engine.dom.mutation_count() - baseline,
        1,
        "a single repositioning suffices for [A,B,C] -> [C,A,B]"
    );
}

#[test]
fn test_keyed_removal_recycles_only_the_missing_child() {
    let mut engine = Engine::new();
    let container = body(&mut engine);

    let root = engine
        .render(keyed_list(&[("a", "A"), ("b", "B"), ("c", "C")]), container)
        .unwrap();
    let before = engine.dom.children(root);

    engine
        .render_over(keyed_list(&[("a", "A"), ("c", "C")]), container, Some(root))
        .unwrap();
    let after = engine.dom.children(root);
    assert_eq!(after, vec![before[0], before[2]]);
}

#[test]
fn test_duplicate_keys_degrade_to_positional() {
    let mut engine = Engine::new();
    let container = body(&mut engine);

    let root = engine
        .render(keyed_list(&[("k", "a"), ("k", "b")]), container)
        .unwrap();
    let before = engine.dom.children(root);
    assert_eq!(before.len(), 2);

    // first occurrence resolves via the key map; the second falls back
    // to positional matching without error
    engine
        .render_over(keyed_list(&[("k", "b"), ("k", "a")]), container, Some(root))
        .unwrap();
    let after = engine.dom.children(root);
    assert_eq!(after, before, "both nodes survive by identity");
    assert_eq!(engine.dom.to_markup(root), "<ul><li>b</li><li>a</li></ul>");
}

#[test]
fn test_unkeyed_positional_matching_by_type() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let tree = |first: &str| {
        build(
            "div",
            PropMap::new(),
            vec![
                build(first, PropMap::new(), vec!["1".into()]).into(),
                build("p", PropMap::new(), vec!["2".into()]).into(),
            ],
        )
    };

    let root = engine.render(tree("span"), container).unwrap();
    let p_before = engine.dom.children(root)[1];

    // span -> em forces one recreation; the p matches by type and lives
    engine.render_over(tree("em"), container, Some(root)).unwrap();
    let kids = engine.dom.children(root);
    assert_eq!(engine.dom.tag(kids[0]), Some("em"));
    assert_eq!(kids[1], p_before);
}

// ---------------------------------------------------------------------
// Text handling
// ---------------------------------------------------------------------

#[test]
fn test_text_updates_in_place() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(build("div", PropMap::new(), vec!["one".into()]), container)
        .unwrap();
    let text = engine.dom.first_child(root).unwrap();

    engine
        .render_over(build("div", PropMap::new(), vec!["two".into()]), container, Some(root))
        .unwrap();
    assert_eq!(engine.dom.first_child(root), Some(text), "node reused");
    assert_eq!(engine.dom.text(text), Some("two"));
}

#[test]
fn test_element_replaces_text_and_back() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(build("div", PropMap::new(), vec!["plain".into()]), container)
        .unwrap();

    let span = build("span", PropMap::new(), vec!["s".into()]);
    engine
        .render_over(build("div", PropMap::new(), vec![span.into()]), container, Some(root))
        .unwrap();
    assert_eq!(engine.dom.to_markup(root), "<div><span>s</span></div>");

    engine
        .render_over(build("div", PropMap::new(), vec!["plain".into()]), container, Some(root))
        .unwrap();
    assert_eq!(engine.dom.to_markup(root), "<div>plain</div>");
}

#[test]
fn test_root_tag_change_migrates_children() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let tree = |tag: &str| {
        build(
            tag,
            PropMap::new(),
            vec![build("span", PropMap::new(), vec!["kept".into()]).into()],
        )
    };

    let section = engine.render(tree("section"), container).unwrap();
    let span = engine.dom.children(section)[0];

    let header = engine
        .render_over(tree("header"), container, Some(section))
        .unwrap();
    assert_ne!(header, section);
    assert_eq!(engine.dom.tag(header), Some("header"));
    assert_eq!(engine.dom.parent(header), Some(container), "replaced inline");
    assert_eq!(engine.dom.parent(section), None);
    assert_eq!(
        engine.dom.children(header),
        vec![span],
        "existing children migrate onto the replacement node"
    );
}

// ---------------------------------------------------------------------
// Attributes, styles, properties
// ---------------------------------------------------------------------

#[test]
fn test_attribute_clear_and_apply() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(
            build("div", props! { "title" => "t", "data-x" => "1" }, vec![]),
            container,
        )
        .unwrap();
    assert_eq!(engine.dom.attribute(root, "title"), Some("t"));

    engine
        .render_over(
            build("div", props! { "data-x" => "2", "lang" => "en" }, vec![]),
            container,
            Some(root),
        )
        .unwrap();
    assert_eq!(engine.dom.attribute(root, "title"), None, "stale name cleared");
    assert_eq!(engine.dom.attribute(root, "data-x"), Some("2"));
    assert_eq!(engine.dom.attribute(root, "lang"), Some("en"));
}

#[test]
fn test_class_name_aliasing() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(build("div", props! { "className" => "alpha" }, vec![]), container)
        .unwrap();
    assert_eq!(engine.dom.attribute(root, "class"), Some("alpha"));
}

#[test]
fn test_style_map_diffing() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let styled = |style: Style| build("div", props! { "style" => style }, vec![]);

    let root = engine
        .render(styled(Style::map([("color", StyleValue::from("red"))])), container)
        .unwrap();
    assert_eq!(engine.dom.style_property(root, "color"), Some("red"));

    engine
        .render_over(
            styled(Style::map([("flex", StyleValue::Num(1.0))])),
            container,
            Some(root),
        )
        .unwrap();
    assert_eq!(engine.dom.style_property(root, "color"), None, "cleared");
    assert_eq!(engine.dom.style_property(root, "flex"), Some("1"), "no unit suffix");
}

#[test]
fn test_style_numeric_values_get_px() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let styled = |w: f64| {
        build(
            "div",
            props! { "style" => Style::map([("width", StyleValue::Num(w))]) },
            vec![],
        )
    };

    let root = engine.render(styled(10.0), container).unwrap();
    assert_eq!(engine.dom.style_property(root, "width"), Some("10px"));

    engine.render_over(styled(20.0), container, Some(root)).unwrap();
    assert_eq!(engine.dom.style_property(root, "width"), Some("20px"));
}

#[test]
fn test_style_string_replaces_wholesale() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(
            build("div", props! { "style" => "color: blue; margin: 4px" }, vec![]),
            container,
        )
        .unwrap();
    assert_eq!(engine.dom.style_property(root, "color"), Some("blue"));
    assert_eq!(engine.dom.style_property(root, "margin"), Some("4px"));
}

#[test]
fn test_live_property_wins_over_cache() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let input = |v: &str| build("input", props! { "value" => v }, vec![]);

    let root = engine.render(input("a"), container).unwrap();
    assert_eq!(
        engine.dom.property(root, "value"),
        Some(&PropertyValue::Str("a".into()))
    );

    // external interaction moves the live value behind the cache's back
    engine
        .dom
        .set_property(root, "value", PropertyValue::Str("typed".into()))
        .unwrap();

    // same declared value: the live node differs, so it is reasserted
    engine.render_over(input("a"), container, Some(root)).unwrap();
    assert_eq!(
        engine.dom.property(root, "value"),
        Some(&PropertyValue::Str("a".into()))
    );
}

#[test]
fn test_rejected_property_assignment_is_swallowed() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    // a boolean for the string-valued property is an environment fault;
    // the pass continues and the rest of the node still applies
    let tree = build("input", props! { "value" => true, "id" => "ok" }, vec![]);
    let root = engine.render(tree, container).unwrap();

    assert_eq!(engine.dom.attribute(root, "id"), Some("ok"));
    assert_eq!(engine.dom.property(root, "value"), None);
}

#[test]
fn test_spellcheck_survives_false() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(build("div", props! { "spellcheck" => false }, vec![]), container)
        .unwrap();
    assert_eq!(
        engine.dom.property(root, "spellcheck"),
        Some(&PropertyValue::Bool(false)),
        "never removed for false"
    );
}

#[test]
fn test_raw_markup_supplants_children() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let mut attrs = PropMap::new();
    attrs.set(RAW_MARKUP_ATTR, Value::Raw("<b>raw</b>".into()));
    let root = engine.render(build("div", attrs, vec![]), container).unwrap();

    assert_eq!(engine.dom.to_markup(root), "<div><b>raw</b></div>");
}

// ---------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------

#[test]
fn test_vector_namespace_enter_and_escape() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let tree = build(
        "svg",
        PropMap::new(),
        vec![
            build("circle", PropMap::new(), vec![]).into(),
            build(
                "foreignObject",
                PropMap::new(),
                vec![build("div", PropMap::new(), vec![]).into()],
            )
            .into(),
        ],
    );
    let root = engine.render(tree, container).unwrap();
    let kids = engine.dom.children(root);
    let escaped_child = engine.dom.children(kids[1])[0];

    assert!(engine.dom.is_namespaced(root));
    assert!(engine.dom.is_namespaced(kids[0]), "circle created namespaced");
    assert!(
        !engine.dom.is_namespaced(escaped_child),
        "escape tag exits the namespace"
    );
}

// ---------------------------------------------------------------------
// Hydration
// ---------------------------------------------------------------------

#[test]
fn test_hydration_reuses_external_tree_without_mutations() {
    let mut engine = Engine::new();
    let container = body(&mut engine);

    // an externally created node with no prior bookkeeping
    let div = engine.dom.create_element("div", false);
    engine.dom.set_attribute(div, "id", "x").unwrap();
    let text = engine.dom.create_text("hi");
    engine.dom.append_child(div, text).unwrap();
    engine.dom.append_child(container, div).unwrap();

    let baseline = engine.dom.mutation_count();
    let root = engine
        .render_over(
            build("div", props! { "id" => "x" }, vec!["hi".into()]),
            container,
            Some(div),
        )
        .unwrap();

    assert_eq!(root, div, "existing node adopted");
    assert_eq!(engine.dom.first_child(div), Some(text), "text node adopted");
    assert_eq!(
        engine.dom.mutation_count(),
        baseline,
        "matching markup hydrates without host mutations"
    );
}

#[test]
fn test_hydration_corrects_mismatched_text() {
    let mut engine = Engine::new();
    let container = body(&mut engine);

    let div = engine.dom.create_element("div", false);
    let text = engine.dom.create_text("stale");
    engine.dom.append_child(div, text).unwrap();
    engine.dom.append_child(container, div).unwrap();

    let root = engine
        .render_over(
            build("div", PropMap::new(), vec!["fresh".into()]),
            container,
            Some(div),
        )
        .unwrap();
    assert_eq!(engine.dom.to_markup(root), "<div>fresh</div>");
}

// ---------------------------------------------------------------------
// Context & derived state
// ---------------------------------------------------------------------

#[derive(Default)]
struct Provider;

impl Component for Provider {
    fn render(&mut self, _cx: &mut Cx<'_>) -> Option<VNode> {
        Some(build(
            "div",
            PropMap::new(),
            vec![build(ComponentKind::of::<Consumer>(), PropMap::new(), vec![]).into()],
        ))
    }

    fn child_context(&mut self, _cx: &mut Cx<'_>) -> Option<PropMap> {
        Some(props! { "theme" => "dark" })
    }
}

#[derive(Default)]
struct Consumer;

impl Component for Consumer {
    fn render(&mut self, cx: &mut Cx<'_>) -> Option<VNode> {
        let theme = cx
            .context
            .get("theme")
            .map(Value::to_text)
            .unwrap_or_else(|| "light".into());
        Some(build("span", PropMap::new(), vec![theme.into()]))
    }
}

#[test]
fn test_child_context_flows_to_descendants() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(build(ComponentKind::of::<Provider>(), PropMap::new(), vec![]), container)
        .unwrap();
    assert_eq!(engine.dom.to_markup(root), "<div><span>dark</span></div>");
}

#[derive(Default)]
struct Derived;

impl Component for Derived {
    fn render(&mut self, cx: &mut Cx<'_>) -> Option<VNode> {
        let d = cx.state.get("doubled").and_then(Value::as_int).unwrap_or(-1);
        Some(build("div", PropMap::new(), vec![d.to_string().into()]))
    }

    fn will_mount(&mut self, _cx: &mut Cx<'_>) {
        log("derived:will_mount");
    }

    fn will_receive_props(&mut self, _next: &PropMap, _ctx: &PropMap, _cx: &mut Cx<'_>) {
        log("derived:will_receive_props");
    }
}

fn derived_kind() -> ComponentKind {
    ComponentKind::of::<Derived>().with_derived_state(|props, _state| {
        let x = props.get("x").and_then(Value::as_int).unwrap_or(0);
        props! { "doubled" => x * 2 }
    })
}

#[test]
fn test_derived_state_suppresses_will_hooks() {
    let mut engine = Engine::new();
    let container = body(&mut engine);
    take_log();

    let root = engine
        .render(build(derived_kind(), props! { "x" => 4 }, vec![]), container)
        .unwrap();
    assert_eq!(engine.dom.to_markup(root), "<div>8</div>");
    assert!(take_log().is_empty(), "static hook suppresses the will-hooks");

    engine
        .render_over(build(derived_kind(), props! { "x" => 5 }, vec![]), container, Some(root))
        .unwrap();
    engine.rerender().unwrap();
    assert_eq!(engine.dom.to_markup(root), "<div>10</div>");
    assert!(take_log().is_empty());
}

#[test]
fn test_default_props_fill_missing_values() {
    #[derive(Default)]
    struct WithDefaults;
    impl Component for WithDefaults {
        fn render(&mut self, cx: &mut Cx<'_>) -> Option<VNode> {
            let a = cx.props.get("a").map(Value::to_text).unwrap_or_default();
            let b = cx.props.get("b").map(Value::to_text).unwrap_or_default();
            Some(build("div", PropMap::new(), vec![format!("{a}{b}").into()]))
        }
    }

    let kind = ComponentKind::of::<WithDefaults>()
        .with_default_props(|| props! { "a" => "A", "b" => "B" });

    let mut engine = Engine::new();
    let container = body(&mut engine);
    let root = engine
        .render(build(kind, props! { "b" => "override" }, vec![]), container)
        .unwrap();
    assert_eq!(engine.dom.to_markup(root), "<div>Aoverride</div>");
}

// ---------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------

#[test]
fn test_render_into_text_container_fails() {
    let mut engine = Engine::new();
    let container = engine.dom.create_text("not a container");
    let result = engine.render(build("div", PropMap::new(), vec![]), container);
    assert!(matches!(
        result,
        Err(RenderError::Dom(DomError::NotAnElement(_)))
    ));
}
