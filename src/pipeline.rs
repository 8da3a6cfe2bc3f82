use std::path::PathBuf;

use serde::Serialize;

use crate::emit::{render_init, render_layer, render_vars, write_units, ConfigUnit};
use crate::error::Result;
use crate::network::{JesusOptions, NetworkPlan};
use crate::topology::{build_all_layers, build_init, LayerGraph, NodeDescriptor};

pub const VARS_FILE: &str = "vars";
pub const INIT_CONFIG_FILE: &str = "init.config";
pub const PLAN_JSON_FILE: &str = "network_plan.json";

/// The plan and every node descriptor for one network, fully validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedConfigs {
    pub plan: NetworkPlan,
    pub init: Vec<NodeDescriptor>,
    pub layers: Vec<LayerGraph>,
}

impl GeneratedConfigs {
    /// `vars`, `init.config`, then `layer1.config` .. `layerN.config`.
    pub fn units(&self) -> Vec<ConfigUnit> {
        let mut units = Vec::with_capacity(self.layers.len() + 2);
        units.push(ConfigUnit::new(VARS_FILE, render_vars(&self.plan)));
        units.push(ConfigUnit::new(INIT_CONFIG_FILE, render_init(&self.init)));
        for graph in &self.layers {
            units.push(ConfigUnit::new(layer_file_name(graph.index), render_layer(graph)));
        }
        units
    }

    /// Pretty-printed JSON of the whole plan, for inspection and tooling.
    pub fn plan_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn layer_file_name(index: usize) -> String {
    format!("layer{index}.config")
}

/// Runs every validation and builds all descriptors in memory. Nothing is
/// written, so any error here leaves the destination untouched.
pub fn generate(options: &JesusOptions) -> Result<GeneratedConfigs> {
    let plan = NetworkPlan::from_options(options)?;
    let init = build_init(&plan);
    let layers = build_all_layers(&plan)?;
    Ok(GeneratedConfigs { plan, init, layers })
}

/// Generates the configs for `options` and writes them to
/// `options.config_dir`, optionally adding `network_plan.json`.
pub fn make_configs(options: &JesusOptions, with_json: bool) -> Result<Vec<PathBuf>> {
    let generated = generate(options)?;
    let mut units = generated.units();
    if with_json {
        units.push(ConfigUnit::new(PLAN_JSON_FILE, generated.plan_json()?));
    }
    write_units(&options.config_dir, &units)
}
