pub mod render;
pub mod writer;

pub use render::{render_init, render_layer, render_vars};
pub use writer::{write_units, ConfigUnit};
