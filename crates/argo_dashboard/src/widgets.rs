//! Dashboard widgets
//!
//! - [`StatCard`]: shows the number stored at a path and re-renders when it changes
//! - [`NumberField`]: labelled numeric input that writes what is typed into a path

use std::cell::RefCell;

use argo_core::prelude::*;
use argo_core::WeakNode;
use serde_json::Value;

use crate::state::format_currency;

props! {
    /// StatCard configuration
    pub struct StatCardProps / StatCardPatch {
        /// Heading shown above the amount
        title: String = String::new(),
        /// Store path of the amount
        path: String = String::new(),
        currency: String = "IDR".to_string(),
        /// Mark negative amounts with a `negative` class
        warn_negative: bool = true,
    }
}

/// Read-only card bound to a numeric store path
///
/// ```text
/// <div class="card"><h3>title</h3><span class="amount">Rp 0</span></div>
/// ```
#[derive(Debug, Default)]
pub struct StatCard;

impl Component for StatCard {
    type Props = StatCardProps;

    fn render(&self, props: &StatCardProps, scope: &Scope<'_, Self>) -> Result<Node> {
        let amount = scope
            .store()
            .get(&props.path)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        let class = if props.warn_negative && amount < 0.0 {
            "card negative"
        } else {
            "card"
        };
        let card = Node::element("div")
            .with_attr("class", class)
            .with_child(Node::element("h3").with_text(props.title.clone()))
            .with_child(
                Node::element("span")
                    .with_attr("class", "amount")
                    .with_text(format_currency(&props.currency, amount)),
            );

        // Subscribed per render so a changed `path` prop takes effect
        if !props.path.is_empty() {
            let handle = scope.handle();
            scope.subscribe_to_state(&props.path, move |_, _, _| {
                handle.update_or_log(StatCardPatch::new());
            });
        }
        Ok(card)
    }

    fn name(&self) -> &'static str {
        "StatCard"
    }
}

props! {
    /// NumberField configuration
    pub struct NumberFieldProps / NumberFieldPatch {
        label: String = String::new(),
        /// Store path written on input
        path: String = String::new(),
        placeholder: String = "0".to_string(),
        disabled: bool = false,
    }
}

/// Numeric input bound to a store path
///
/// An `input` event whose data is a number, or a string that parses as one,
/// is written to `path`. Anything else is logged and ignored. The rendered
/// `<input>` is remembered so [`focus`](Self::focus) and
/// [`set_value`](Self::set_value) can reach it between renders.
#[derive(Debug, Default)]
pub struct NumberField {
    input: RefCell<WeakNode>,
}

impl NumberField {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `<input>` of the latest render, while it is still alive
    pub fn input(&self) -> Option<Node> {
        self.input.borrow().upgrade()
    }

    /// Mark the input focused. Returns false if nothing is rendered.
    pub fn focus(&self) -> bool {
        match self.input() {
            Some(input) => {
                input.set_attribute("data-focused", "true");
                true
            }
            None => false,
        }
    }

    /// Show `value` in the input without writing the store
    pub fn set_value(&self, value: f64) -> bool {
        match self.input() {
            Some(input) => {
                input.set_attribute("value", value.to_string());
                true
            }
            None => false,
        }
    }
}

/// Interpret the data of an `input` event as a number
pub fn parse_input(data: &Value) -> Option<f64> {
    let parsed = match data {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.replace(',', ".").parse().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

impl Component for NumberField {
    type Props = NumberFieldProps;

    fn render(&self, props: &NumberFieldProps, scope: &Scope<'_, Self>) -> Result<Node> {
        if props.path.is_empty() || argo_core::path::segments(&props.path).any(str::is_empty) {
            return Err(StoreError::EmptyPath(props.path.clone()).into());
        }
        let current = scope.store().get(&props.path).and_then(|v| v.as_f64());

        let input = Node::element("input")
            .with_attr("type", "number")
            .with_attr("placeholder", props.placeholder.clone());
        if let Some(current) = current {
            input.set_attribute("value", current.to_string());
        }
        if props.disabled {
            input.set_attribute("disabled", "true");
        }

        if !props.disabled {
            let store = scope.store().clone();
            let path = props.path.clone();
            scope.bind_external_event(&input, "input", move |event| {
                let Some(value) = parse_input(&event.data) else {
                    tracing::warn!("ignoring non-numeric input for {}: {}", path, event.data);
                    return;
                };
                if let Err(err) = store.set(&path, value) {
                    tracing::error!("failed to write {}: {}", path, err);
                }
            });
        }

        *self.input.borrow_mut() = input.downgrade();

        Ok(Node::element("label")
            .with_text(props.label.clone())
            .with_child(input))
    }

    fn name(&self) -> &'static str {
        "NumberField"
    }
}
