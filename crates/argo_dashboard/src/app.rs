//! Dashboard assembly
//!
//! Builds the runtime from a [`DashboardConfig`], creates one input field per
//! platform and fuel parameter plus the three result cards, and mounts them
//! under a single root node.

use std::rc::Rc;

use argo_core::prelude::*;
use argo_core::RuntimeStats;

use crate::config::DashboardConfig;
use crate::state::{self, Results};
use crate::widgets::{NumberField, NumberFieldPatch, StatCard, StatCardPatch};

/// A mounted-or-not dashboard and the runtime it owns
pub struct Dashboard {
    runtime: Runtime,
    root: Node,
    fields: Vec<(String, Rc<Instance<NumberField>>)>,
    cards: Vec<Rc<Instance<StatCard>>>,
    watcher: Option<Subscription>,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig) -> Self {
        let runtime = Runtime::with_config(state::initial_state(config), config.runtime.clone());
        let currency = config.settings.currency.clone();

        let mut fields = Vec::new();
        for platform in &config.settings.platforms {
            let path = format!("platforms.{}", platform);
            let patch = NumberFieldPatch::new().label(platform.clone()).path(path.clone());
            fields.push((path, Instance::new(runtime.clone(), NumberField::new(), patch)));
        }
        for (key, label) in [
            ("jarak", "Jarak (km)"),
            ("konsumsi", "Konsumsi (km/l)"),
            ("harga", "Harga per liter"),
        ] {
            let path = format!("fuel.{}", key);
            let patch = NumberFieldPatch::new().label(label).path(path.clone());
            fields.push((path, Instance::new(runtime.clone(), NumberField::new(), patch)));
        }

        let cards = [
            ("Total Kotor", "results.totalKotor", false),
            ("Biaya Bensin", "results.biayaBensin", false),
            ("Bersih", "results.bersih", true),
        ]
        .into_iter()
        .map(|(title, path, warn_negative)| {
            let patch = StatCardPatch::new()
                .title(title)
                .path(path)
                .currency(currency.clone())
                .warn_negative(warn_negative);
            Instance::new(runtime.clone(), StatCard, patch)
        })
        .collect();

        Self {
            runtime,
            root: Node::element("main").with_attr("class", "dashboard"),
            fields,
            cards,
            watcher: None,
        }
    }

    /// Mount every widget and start recomputing results on input
    ///
    /// Does nothing if already mounted. If a widget fails to mount, the ones
    /// mounted before it are unmounted again so a later call starts clean.
    pub fn mount(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        if let Err(err) = self.mount_widgets() {
            tracing::error!("dashboard mount failed: {}", err);
            self.unmount();
            return Err(err);
        }
        self.watcher = Some(state::watch_inputs(self.runtime.store()));

        tracing::info!(
            "dashboard mounted: {} fields, {} cards",
            self.fields.len(),
            self.cards.len()
        );
        Ok(())
    }

    fn mount_widgets(&self) -> Result<()> {
        let inputs = Node::element("section").with_attr("class", "inputs");
        let summary = Node::element("section").with_attr("class", "summary");
        self.root.append_child(&inputs);
        self.root.append_child(&summary);

        for (_, field) in &self.fields {
            field.mount(Some(&inputs))?;
        }
        for card in &self.cards {
            card.mount(Some(&summary))?;
        }
        Ok(())
    }

    /// Unmount every widget and stop recomputing
    pub fn unmount(&mut self) {
        for (_, field) in &self.fields {
            field.unmount();
        }
        for card in &self.cards {
            card.unmount();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.unsubscribe();
        }
        for section in self.root.children() {
            self.root.remove_child(&section);
        }
        tracing::info!("dashboard unmounted");
    }

    /// Type `text` into the field bound to `path`
    ///
    /// Returns false if there is no such field or it is not mounted.
    pub fn input(&self, path: &str, text: &str) -> bool {
        let input = self
            .fields
            .iter()
            .find(|(field_path, _)| field_path == path)
            .and_then(|(_, field)| field.component().input());
        match input {
            Some(input) => {
                tracing::debug!("input {} <- {:?}", path, text);
                input.dispatch("input", text) > 0
            }
            None => false,
        }
    }

    /// Focus the field bound to `path`
    pub fn focus(&self, path: &str) -> bool {
        self.fields
            .iter()
            .find(|(field_path, _)| field_path == path)
            .is_some_and(|(_, field)| field.component().focus())
    }

    pub fn results(&self) -> Results {
        self.runtime.store().with_state(state::compute_results)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn render_to_string(&self) -> String {
        self.root.render_to_string()
    }

    pub fn stats(&self) -> RuntimeStats {
        self.runtime.stats()
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        if self.watcher.is_some() {
            self.unmount();
        }
    }
}
