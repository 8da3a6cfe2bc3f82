pub mod dims;
pub mod options;
pub mod plan;

pub use dims::{resolve_dims, round_up_to_multiple, DimAdjustment, ResolvedDims};
pub use options::JesusOptions;
pub use plan::NetworkPlan;
