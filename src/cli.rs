use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use crate::error::TopologyError;
use crate::network::options::{
    JesusOptions, DEFAULT_CLIPPING_THRESHOLD, DEFAULT_JESUS_HIDDEN_DIM, DEFAULT_JESUS_OUTPUT_DIM,
};
use crate::pipeline::make_configs;

/// Writes config files and variables for creating and training a TDNN or
/// RNN built from Jesus layers.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "make-jesus-configs",
    version,
    after_help = "See steps/nnet3/train_tdnn.sh for an example."
)]
pub struct Cli {
    /// Splice[:recurrence] indexes at each hidden layer, e.g.
    /// '-3,-2,-1,0,1,2,3 -3,0:-3 -3,0:-3 -6,-3,0:-6,-3'. Recurrence indexes
    /// are optional, may not appear in the 1st layer, may not include zero,
    /// and must be either all negative or all positive for any given layer.
    #[arg(long, allow_hyphen_values = true)]
    pub splice_indexes: Option<String>,

    /// Raw feature dimension, e.g. 13
    #[arg(long)]
    pub feat_dim: Option<usize>,

    /// iVector dimension, e.g. 100
    #[arg(long, default_value_t = 0)]
    pub ivector_dim: usize,

    /// Add the final log-softmax layer
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub include_log_softmax: bool,

    /// RMS target for the final hidden layer (set to <1 if the final layer learns too fast)
    #[arg(long, default_value_t = 1.0)]
    pub final_layer_normalize_target: f64,

    /// Width of each layer's affine output, which the Jesus layer splits into blocks
    #[arg(long, default_value_t = DEFAULT_JESUS_HIDDEN_DIM)]
    pub jesus_hidden_dim: usize,

    /// Output dimension of the Jesus layer
    #[arg(long, default_value_t = DEFAULT_JESUS_OUTPUT_DIM)]
    pub jesus_output_dim: usize,

    /// Summed width of the per-block bottleneck affine components
    #[arg(long)]
    pub affine_output_dim: Option<usize>,

    /// Add a ReLU nonlinearity after the Jesus layer
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub include_relu: bool,

    /// Number of blocks in the Jesus layer. --jesus-output-dim, --jesus-hidden-dim
    /// and --affine-output-dim are rounded up to a multiple of this.
    #[arg(long)]
    pub num_jesus_blocks: Option<usize>,

    /// Input width of each Jesus block; must equal jesus-hidden-dim / num-jesus-blocks
    #[arg(long)]
    pub jesus_part_dim: Option<usize>,

    /// Clipping threshold of the ClipGradient components on recurrent
    /// connections; 0 disables clipping
    #[arg(long, default_value_t = DEFAULT_CLIPPING_THRESHOLD)]
    pub clipping_threshold: f64,

    /// Number of network targets (e.g. num-pdf-ids/num-leaves)
    #[arg(long)]
    pub num_targets: Option<usize>,

    /// Also write network_plan.json with every node descriptor
    #[arg(long)]
    pub json: bool,

    /// Directory to write config files and variables
    pub config_dir: PathBuf,
}

impl Cli {
    /// Turns the parsed flags into an options record, reporting the first
    /// required option that is absent.
    pub fn to_options(&self) -> std::result::Result<JesusOptions, TopologyError> {
        let splice_indexes = self
            .splice_indexes
            .clone()
            .ok_or(TopologyError::MissingArgument("splice-indexes"))?;
        let feat_dim = self.feat_dim.ok_or(TopologyError::MissingArgument("feat-dim"))?;
        let num_targets = self.num_targets.ok_or(TopologyError::MissingArgument("num-targets"))?;
        let num_jesus_blocks = self
            .num_jesus_blocks
            .ok_or(TopologyError::MissingArgument("num-jesus-blocks"))?;
        let affine_output_dim = self
            .affine_output_dim
            .ok_or(TopologyError::MissingArgument("affine-output-dim"))?;

        Ok(JesusOptions {
            ivector_dim: self.ivector_dim,
            jesus_hidden_dim: self.jesus_hidden_dim,
            jesus_output_dim: self.jesus_output_dim,
            jesus_part_dim: self.jesus_part_dim,
            include_log_softmax: self.include_log_softmax,
            include_relu: self.include_relu,
            final_layer_normalize_target: self.final_layer_normalize_target,
            clipping_threshold: self.clipping_threshold,
            ..JesusOptions::new(
                splice_indexes,
                feat_dim,
                num_targets,
                num_jesus_blocks,
                affine_output_dim,
                self.config_dir.clone(),
            )
        })
    }

    pub fn run(self) -> Result<()> {
        let options = self.to_options()?;
        let written = make_configs(&options, self.json).with_context(|| {
            format!("could not write configs to {}", options.config_dir.display())
        })?;
        log::info!("wrote {} files to {}", written.len(), options.config_dir.display());
        Ok(())
    }
}
