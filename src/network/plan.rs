use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::network::dims::{resolve_dims, ResolvedDims};
use crate::network::options::JesusOptions;
use crate::splice::{parse_splice_indexes, LayerSpec};

/// The validated, immutable description of a whole network.
///
/// Built once from a [`JesusOptions`]; the topology builder only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPlan {
    pub options: JesusOptions,
    pub layers: Vec<LayerSpec>,
    pub dims: ResolvedDims,
    pub left_context: usize,
    pub right_context: usize,
}

impl NetworkPlan {
    /// Validates the options, parses the splice indexes and resolves all widths.
    pub fn from_options(options: &JesusOptions) -> Result<NetworkPlan> {
        options.validate()?;
        let splices = parse_splice_indexes(&options.splice_indexes)?;
        let dims = resolve_dims(options, &splices)?;
        log::info!(
            "left_context={} right_context={} num_hidden_layers={}",
            splices.left_context,
            splices.right_context,
            splices.num_layers()
        );
        Ok(NetworkPlan {
            options: options.clone(),
            left_context: splices.left_context,
            right_context: splices.right_context,
            layers: splices.layers,
            dims,
        })
    }

    pub fn num_hidden_layers(&self) -> usize {
        self.layers.len()
    }

    /// Layer spec for a 1-based layer index.
    pub fn layer(&self, index: usize) -> Option<&LayerSpec> {
        index.checked_sub(1).and_then(|i| self.layers.get(i))
    }

    /// RMS target of `renorm<index>`: the last hidden layer may be told to
    /// learn more slowly.
    pub fn target_rms(&self, index: usize) -> f64 {
        if index < self.num_hidden_layers() {
            1.0
        } else {
            self.options.final_layer_normalize_target
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;

    #[test]
    fn plan_carries_context_and_layers() {
        let opts = JesusOptions {
            final_layer_normalize_target: 0.5,
            ..JesusOptions::new("-3,-2,-1,0,1,2,3 -3,0:-3 -3,0:-3 -6,-3,0:-6,-3", 40, 3000, 10, 500, "cfg")
        };
        let plan = NetworkPlan::from_options(&opts).unwrap();
        assert_eq!(plan.num_hidden_layers(), 4);
        assert_eq!(plan.left_context, 15);
        assert_eq!(plan.right_context, 3);
        assert_eq!(plan.dims.input_dim, 7 * 40);
        assert_eq!(plan.layer(4).unwrap().recurrence_offsets, vec![-6, -3]);
        assert!(plan.layer(0).is_none());
        assert!(plan.layer(5).is_none());
        assert_eq!(plan.target_rms(1), 1.0);
        assert_eq!(plan.target_rms(3), 1.0);
        assert_eq!(plan.target_rms(4), 0.5);
    }

    #[test]
    fn option_errors_come_before_parse_errors() {
        let opts = JesusOptions::new("garbage", 0, 3000, 10, 500, "cfg");
        assert!(matches!(
            NetworkPlan::from_options(&opts),
            Err(TopologyError::MissingArgument("feat-dim"))
        ));
    }
}
