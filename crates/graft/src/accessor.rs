//! Host attribute accessor.
//!
//! The single entry point through which the reconciler touches host
//! attributes, with the special cases the host contract calls for:
//! class-name aliasing, inline style (string or property map, numeric
//! values unit-suffixed unless the property is a known unitless one),
//! raw-markup injection, ref invocation, `on*` listener toggling with a
//! capture variant, and a property-vs-attribute fallback where null and
//! `false` mean removal. Property-assignment faults are an environment
//! quirk: they are logged and swallowed, never a pass failure.

use graft_dom::{NodeId, PropertyValue};
use tracing::warn;

use crate::engine::Engine;
use crate::error::RenderResult;
use crate::event::ListenPhase;
use crate::value::{apply_ref, fmt_number, RefTarget, Style, StyleValue, Value};

/// Prop name carrying embedded children; never written to the host.
pub const CHILDREN_PROP: &str = "children";

/// Attribute name for raw-content injection.
pub const RAW_MARKUP_ATTR: &str = "raw-markup";

pub(crate) const KEY_ATTR: &str = "key";
pub(crate) const REF_ATTR: &str = "ref";

/// Properties compared against the live node rather than the cache,
/// since external interaction can change them.
pub(crate) const LIVE_PROPERTIES: &[&str] = &["value", "checked"];

/// Property names the host exposes; everything else is an attribute.
const PROPERTY_NAMES: &[&str] = &["value", "checked", "selected", "disabled", "spellcheck"];

/// Boolean attribute never removed for `false`.
const NEVER_REMOVED: &str = "spellcheck";

impl Engine {
    /// Apply one named value to a host node.
    pub(crate) fn set_accessor(
        &mut self,
        node: NodeId,
        name: &str,
        old: Option<&Value>,
        value: Option<&Value>,
        namespaced: bool,
    ) -> RenderResult<()> {
        if name == KEY_ATTR || name == CHILDREN_PROP {
            return Ok(());
        }

        if name == REF_ATTR {
            if let Some(Value::Ref(old_slot)) = old {
                apply_ref(Some(old_slot), None);
            }
            if let Some(Value::Ref(slot)) = value {
                apply_ref(Some(slot), Some(RefTarget::Node(node)));
            }
            return Ok(());
        }

        if name == "class" || name == "className" {
            let text = value.map(Value::to_text).unwrap_or_default();
            if text.is_empty() {
                self.dom.remove_attribute(node, "class")?;
            } else {
                self.dom.set_attribute(node, "class", &text)?;
            }
            return Ok(());
        }

        if name == "style" {
            return self.set_style(node, old, value);
        }

        if name == RAW_MARKUP_ATTR {
            if let Some(v) = value {
                if v.is_truthy() {
                    let markup = match v {
                        Value::Raw(s) | Value::Str(s) => s.clone(),
                        other => other.to_text(),
                    };
                    self.dom.set_raw_markup(node, Some(markup))?;
                }
            }
            return Ok(());
        }

        if let Some(event_name) = name.strip_prefix("on") {
            if !event_name.is_empty() {
                let (event_name, phase) = match event_name.strip_suffix("Capture") {
                    Some(rest) => (rest, ListenPhase::Capture),
                    None => (event_name, ListenPhase::Bubble),
                };
                let handler = match value {
                    Some(Value::Handler(h)) => Some(h.clone()),
                    _ => None,
                };
                self.set_listener(node, &event_name.to_ascii_lowercase(), phase, handler);
                return Ok(());
            }
        }

        if !namespaced && PROPERTY_NAMES.contains(&name) {
            let result = match value {
                None | Some(Value::Null) => self.dom.remove_property(node, name),
                Some(Value::Bool(b)) => self.dom.set_property(node, name, PropertyValue::Bool(*b)),
                Some(v) => self
                    .dom
                    .set_property(node, name, PropertyValue::Str(v.to_text())),
            };
            if let Err(err) = result {
                // environment quirk, not a semantic error
                warn!(?node, name, %err, "property assignment rejected; skipping");
            }
            let removal = value.is_none() || value.is_some_and(Value::is_removal);
            if removal && name != NEVER_REMOVED {
                self.dom.remove_attribute(node, name)?;
            }
            return Ok(());
        }

        // generic attribute fallback
        match value {
            None => self.dom.remove_attribute(node, name)?,
            Some(v) if v.is_removal() => self.dom.remove_attribute(node, name)?,
            Some(Value::Handler(_)) | Some(Value::Nodes(_)) => {}
            Some(v) => self.dom.set_attribute(node, name, &v.to_text())?,
        }
        Ok(())
    }

    fn set_style(
        &mut self,
        node: NodeId,
        old: Option<&Value>,
        value: Option<&Value>,
    ) -> RenderResult<()> {
        let old_map = match old {
            Some(Value::Style(Style::Map(m))) => Some(m),
            _ => None,
        };
        match value {
            None | Some(Value::Null) => {
                self.dom.set_style_text(node, "")?;
            }
            Some(Value::Str(text)) | Some(Value::Style(Style::Text(text))) => {
                self.dom.set_style_text(node, text)?;
            }
            Some(Value::Style(Style::Map(new_map))) => {
                // a previous raw declaration string is replaced wholesale
                if matches!(old, Some(Value::Str(_)) | Some(Value::Style(Style::Text(_)))) {
                    self.dom.set_style_text(node, "")?;
                }
                if let Some(old_map) = old_map {
                    for (name, _) in old_map {
                        if !new_map.iter().any(|(n, _)| n == name) {
                            self.dom.set_style_property(node, name, "")?;
                        }
                    }
                }
                for (name, sv) in new_map {
                    self.dom.set_style_property(node, name, &css_value(name, sv))?;
                }
            }
            Some(other) => {
                self.dom.set_style_text(node, &other.to_text())?;
            }
        }
        Ok(())
    }
}

/// Render one style value, suffixing the length unit onto numerics
/// unless the property is a known unitless one.
fn css_value(name: &str, value: &StyleValue) -> String {
    match value {
        StyleValue::Str(s) => s.clone(),
        StyleValue::Num(n) => {
            if is_unitless_property(name) {
                fmt_number(*n)
            } else {
                format!("{}px", fmt_number(*n))
            }
        }
    }
}

/// Style properties that take bare numbers (flex, order, opacity,
/// line-height, z-index, ...), matched the way the classic
/// non-dimensional pattern does.
fn is_unitless_property(name: &str) -> bool {
    let n = name.to_ascii_lowercase();
    const FRAGMENTS: &[&str] = &[
        "acit", "exs", "exg", "exn", "exp", "rph", "ows", "mnc", "ntw", "inec", "ineh", "zoo",
    ];
    n.starts_with("ord")
        || n.ends_with("ex")
        || FRAGMENTS.iter().any(|f| n.contains(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unitless_detection() {
        assert!(is_unitless_property("flex"));
        assert!(is_unitless_property("zIndex"));
        assert!(is_unitless_property("opacity"));
        assert!(is_unitless_property("order"));
        assert!(is_unitless_property("lineHeight"));
        assert!(!is_unitless_property("width"));
        assert!(!is_unitless_property("margin-top"));
    }

    #[test]
    fn test_css_value_units() {
        assert_eq!(css_value("width", &StyleValue::Num(20.0)), "20px");
        assert_eq!(css_value("flex", &StyleValue::Num(1.0)), "1");
        assert_eq!(css_value("color", &StyleValue::Str("red".into())), "red");
    }
}
