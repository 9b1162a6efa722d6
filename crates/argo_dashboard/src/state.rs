//! Dashboard state shape and the calculations that keep `results` current
//!
//! ```text
//! platforms.<name>   gross earnings per platform
//! fuel.jarak         km driven
//! fuel.konsumsi      km per litre
//! fuel.harga         price per litre
//! results.totalKotor sum of platform earnings
//! results.biayaBensin jarak / konsumsi * harga
//! results.bersih     totalKotor - biayaBensin
//! ui.currentView, ui.loading
//! settings.currency, settings.autoSave
//! ```

use std::rc::Rc;

use argo_core::{StateChange, Store, StoreError, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::DashboardConfig;

/// Computed totals stored under `results`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub total_kotor: f64,
    pub biaya_bensin: f64,
    pub bersih: f64,
}

/// Partial update of the `fuel` subtree
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FuelInput {
    pub jarak: Option<f64>,
    pub konsumsi: Option<f64>,
    pub harga: Option<f64>,
}

impl FuelInput {
    pub fn jarak(mut self, km: f64) -> Self {
        self.jarak = Some(km);
        self
    }

    pub fn konsumsi(mut self, km_per_litre: f64) -> Self {
        self.konsumsi = Some(km_per_litre);
        self
    }

    pub fn harga(mut self, per_litre: f64) -> Self {
        self.harga = Some(per_litre);
        self
    }
}

/// Initial tree for a fresh session
pub fn initial_state(config: &DashboardConfig) -> Value {
    let platforms: Map<String, Value> = config
        .settings
        .platforms
        .iter()
        .map(|name| (name.clone(), json!(0.0)))
        .collect();

    let mut state = json!({
        "platforms": platforms,
        "fuel": {
            "jarak": config.fuel.jarak,
            "konsumsi": config.fuel.konsumsi,
            "harga": config.fuel.harga,
        },
        "results": Results::default(),
        "ui": { "currentView": "dashboard", "loading": false },
        "settings": {
            "currency": config.settings.currency,
            "autoSave": config.settings.auto_save,
        },
    });
    let results = compute_results(&state);
    state["results"] = json!(results);
    state
}

/// Compute `results` from the platform and fuel subtrees of `state`
///
/// Missing or non-numeric inputs count as zero; zero consumption means no
/// fuel cost.
pub fn compute_results(state: &Value) -> Results {
    let total_kotor = state["platforms"]
        .as_object()
        .map(|platforms| platforms.values().filter_map(Value::as_f64).sum())
        .unwrap_or(0.0);

    let fuel = &state["fuel"];
    let jarak = fuel["jarak"].as_f64().unwrap_or(0.0);
    let konsumsi = fuel["konsumsi"].as_f64().unwrap_or(0.0);
    let harga = fuel["harga"].as_f64().unwrap_or(0.0);
    let biaya_bensin = if konsumsi > 0.0 {
        jarak / konsumsi * harga
    } else {
        0.0
    };

    Results {
        total_kotor,
        biaya_bensin,
        bersih: total_kotor - biaya_bensin,
    }
}

/// Write the fields of `input` that are set, then recompute results
pub fn update_fuel(store: &Store, input: FuelInput) -> Result<Results, StoreError> {
    let fields = [
        ("fuel.jarak", input.jarak),
        ("fuel.konsumsi", input.konsumsi),
        ("fuel.harga", input.harga),
    ];
    for (path, value) in fields {
        if let Some(value) = value {
            store.set(path, value)?;
        }
    }
    recompute(store)
}

/// Set one platform's total, then recompute results
pub fn set_platform_total(
    store: &Store,
    platform: &str,
    amount: f64,
) -> Result<Results, StoreError> {
    store.set(&format!("platforms.{}", platform), amount)?;
    recompute(store)
}

/// Recompute `results` and write each field that changed
///
/// Fields are written one by one so subscribers on e.g. `results.bersih`
/// hear about their own value.
pub fn recompute(store: &Store) -> Result<Results, StoreError> {
    let results = store.with_state(compute_results);
    let previous: Results = store
        .get("results")
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let fields = [
        ("results.totalKotor", previous.total_kotor, results.total_kotor),
        ("results.biayaBensin", previous.biaya_bensin, results.biaya_bensin),
        ("results.bersih", previous.bersih, results.bersih),
    ];
    for (path, old, new) in fields {
        if old != new {
            store.set(path, new)?;
        }
    }
    tracing::debug!(
        "results: gross={} fuel={} net={}",
        results.total_kotor,
        results.biaya_bensin,
        results.bersih
    );
    Ok(results)
}

/// Recompute `results` whenever a platform total or fuel field is written
///
/// Listens on the store's state-change topic, so writes made directly with
/// [`Store::set`] (e.g. by an input field) are covered too.
pub fn watch_inputs(store: &Rc<Store>) -> Subscription {
    let weak = Rc::downgrade(store);
    let topic = store.config().state_change_topic.clone();
    store.bus().subscribe(&topic, move |payload| {
        let Some(change) = StateChange::from_payload(payload) else {
            return;
        };
        if !is_input_path(&change.path) {
            return;
        }
        if let Some(store) = weak.upgrade() {
            if let Err(err) = recompute(&store) {
                tracing::error!("recompute after {} failed: {}", change.path, err);
            }
        }
    })
}

fn is_input_path(path: &str) -> bool {
    ["platforms", "fuel"].iter().any(|root| {
        path == *root
            || path
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Format an amount the way the cards display it, e.g. `Rp 150.000`
pub fn format_currency(currency: &str, amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    let symbol = match currency {
        "IDR" => "Rp",
        other => other,
    };
    format!("{}{} {}", sign, symbol, grouped)
}
