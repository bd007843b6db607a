pub mod apply;
pub mod image;
pub mod plan;
pub mod refresh;
pub mod state;
pub mod validate;
