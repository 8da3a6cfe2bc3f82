pub mod builder;
pub mod descriptor;

pub use builder::{build_all_layers, build_init, build_layer, LayerGraph, LayerSource, PriorLayer};
pub use descriptor::{Descriptor, IndexVar, NodeDescriptor, NodeKind, Nonlinearity};
