//! Demo: a small stateful app rendered through the graft engine.
//!
//! Drives the full loop end to end: initial mount, synthetic click
//! events, and deferred render flushes scheduled onto a cooperative
//! executor turn - the same shape an embedder's paint cycle would have.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use graft::{
    build, props, Child, Component, ComponentKind, Cx, Engine, Event, EventHandler, Options,
    PropMap, Value, VNode,
};
use tracing::info;

#[derive(Default)]
struct TodoApp;

impl Component for TodoApp {
    fn render(&mut self, cx: &mut Cx<'_>) -> Option<VNode> {
        let count = cx.state.get("count").and_then(Value::as_int).unwrap_or(0);
        let id = cx.id();
        let add: EventHandler = Rc::new(move |_event, engine| {
            let n = engine
                .state_of(id)
                .and_then(|s| s.get("count"))
                .and_then(Value::as_int)
                .unwrap_or(0);
            engine.set_state(id, props! { "count" => n + 1 });
        });

        let items: Vec<Child> = (0..count)
            .map(|i| {
                build(
                    "li",
                    props! { "key" => format!("item-{i}") },
                    vec![format!("item {i}").into()],
                )
                .into()
            })
            .collect();

        let mut button_attrs = props! { "class" => "add" };
        button_attrs.set("onClick", Value::Handler(add));

        Some(build(
            "div",
            props! { "class" => "app" },
            vec![
                build("button", button_attrs, vec![format!("count: {count}").into()]).into(),
                build("ul", PropMap::new(), vec![Child::List(items)]).into(),
            ],
        ))
    }

    fn did_mount(&mut self, _cx: &mut Cx<'_>) {
        info!("app mounted");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // the scheduler's notify primitive marks a pending flush; the
    // executor turn below picks it up
    let pending = Rc::new(Cell::new(false));
    let notify = pending.clone();
    let mut engine = Engine::with_options(Options {
        schedule: Some(Box::new(move || notify.set(true))),
        ..Options::default()
    });

    let container = engine.dom.create_element("body", false);

    smol::block_on(async {
        let tree = build(ComponentKind::of::<TodoApp>(), PropMap::new(), vec![]);
        let root = engine.render(tree, container)?;
        println!("mounted:  {}", engine.dom.to_markup(container));

        let button = engine
            .dom
            .first_child(root)
            .ok_or_else(|| anyhow::anyhow!("app did not render a button"))?;

        for turn in 1..=3 {
            engine.dispatch_event(button, Event::new("click", button));

            // the update is deferred; it applies on the next turn
            smol::future::yield_now().await;
            if pending.replace(false) {
                engine.rerender()?;
            }
            println!("turn {turn}:   {}", engine.dom.to_markup(container));
        }

        info!(
            nodes = engine.dom.len(),
            mutations = engine.dom.mutation_count(),
            "done"
        );
        anyhow::Ok(())
    })?;

    Ok(())
}
