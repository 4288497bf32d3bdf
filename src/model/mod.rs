//! Classifier loading and inference components

pub mod inference;
pub mod loader;

pub use inference::{ChurnModel, OnnxChurnModel};
pub use loader::ModelLoader;
