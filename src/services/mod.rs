//! Background services

pub mod renderer;

pub use renderer::{StateRenderer, StateRendererHandle};
