pub mod cli;
pub mod emit;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod splice;
pub mod topology;

// Convenience re-exports
pub use error::{Result, TopologyError};
pub use network::{JesusOptions, NetworkPlan};
pub use pipeline::{generate, make_configs, GeneratedConfigs};
pub use splice::{parse_splice_indexes, LayerSpec, SpliceSpec};
pub use topology::{build_layer, LayerGraph, LayerSource, NodeDescriptor, NodeKind};
