use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopologyError};

pub const DEFAULT_JESUS_HIDDEN_DIM: usize = 10000;
pub const DEFAULT_JESUS_OUTPUT_DIM: usize = 1000;
pub const DEFAULT_CLIPPING_THRESHOLD: f64 = 15.0;

/// Everything needed to describe one Jesus-layer network.
///
/// # Fields
/// - `splice_indexes`     — per-layer `splices[:recurrence]` string, see
///                          [`parse_splice_indexes`](crate::splice::parse_splice_indexes)
/// - `feat_dim`           — raw feature dimension, e.g. 13 or 40
/// - `ivector_dim`        — iVector dimension; `0` means no side input
/// - `num_targets`        — network output dimension (number of pdf-ids)
/// - `jesus_hidden_dim`   — width of each layer's affine output, which is the
///                          vector the Jesus layer distributes into blocks
/// - `jesus_output_dim`   — width of the recombined Jesus layer output
/// - `affine_output_dim`  — summed width of the per-block bottlenecks
/// - `num_jesus_blocks`   — number of blocks; the three widths above are
///                          rounded up to a multiple of it
/// - `jesus_part_dim`     — block input width; derived from
///                          `jesus_hidden_dim / num_jesus_blocks` when `None`
/// - `clipping_threshold` — gradient clipping on recurrent connections;
///                          `0` disables clipping
/// - `config_dir`         — where the configs go; layer 1 reads `lda.mat` from here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JesusOptions {
    pub splice_indexes: String,
    pub feat_dim: usize,
    pub ivector_dim: usize,
    pub num_targets: usize,
    pub jesus_hidden_dim: usize,
    pub jesus_output_dim: usize,
    pub affine_output_dim: usize,
    pub num_jesus_blocks: usize,
    pub jesus_part_dim: Option<usize>,
    pub include_log_softmax: bool,
    pub include_relu: bool,
    pub final_layer_normalize_target: f64,
    pub clipping_threshold: f64,
    pub config_dir: PathBuf,
}

impl JesusOptions {
    /// Creates options for the required fields; everything else takes the
    /// same defaults as the command line.
    pub fn new(
        splice_indexes: impl Into<String>,
        feat_dim: usize,
        num_targets: usize,
        num_jesus_blocks: usize,
        affine_output_dim: usize,
        config_dir: impl Into<PathBuf>,
    ) -> Self {
        JesusOptions {
            splice_indexes: splice_indexes.into(),
            feat_dim,
            ivector_dim: 0,
            num_targets,
            jesus_hidden_dim: DEFAULT_JESUS_HIDDEN_DIM,
            jesus_output_dim: DEFAULT_JESUS_OUTPUT_DIM,
            affine_output_dim,
            num_jesus_blocks,
            jesus_part_dim: None,
            include_log_softmax: true,
            include_relu: true,
            final_layer_normalize_target: 1.0,
            clipping_threshold: DEFAULT_CLIPPING_THRESHOLD,
            config_dir: config_dir.into(),
        }
    }

    /// Checks the field-level invariants that do not depend on parsing or
    /// rounding.
    pub fn validate(&self) -> Result<()> {
        if self.splice_indexes.trim().is_empty() {
            return Err(TopologyError::MissingArgument("splice-indexes"));
        }
        if self.feat_dim == 0 {
            return Err(TopologyError::MissingArgument("feat-dim"));
        }
        if self.num_targets == 0 {
            return Err(TopologyError::MissingArgument("num-targets"));
        }
        if self.num_jesus_blocks == 0 {
            return Err(invalid("num-jesus-blocks", "must be at least 1"));
        }
        for (option, value) in [
            ("jesus-hidden-dim", self.jesus_hidden_dim),
            ("jesus-output-dim", self.jesus_output_dim),
            ("affine-output-dim", self.affine_output_dim),
        ] {
            if value == 0 {
                return Err(invalid(option, "must be positive"));
            }
        }
        if !(self.final_layer_normalize_target > 0.0) {
            return Err(invalid(
                "final-layer-normalize-target",
                &format!("must be positive, got {}", self.final_layer_normalize_target),
            ));
        }
        if !(self.clipping_threshold >= 0.0) {
            return Err(invalid(
                "clipping-threshold",
                &format!("must be non-negative, got {}", self.clipping_threshold),
            ));
        }
        Ok(())
    }

    /// Path of the externally produced LDA matrix that layer 1 references.
    pub fn lda_matrix_path(&self) -> PathBuf {
        self.config_dir.join("lda.mat")
    }
}

fn invalid(option: &'static str, reason: &str) -> TopologyError {
    TopologyError::InvalidArgument { option, reason: reason.to_owned() }
}
