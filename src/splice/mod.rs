pub mod layer_spec;
pub mod parser;

pub use layer_spec::{LayerSpec, SpliceSpec};
pub use parser::parse_splice_indexes;
