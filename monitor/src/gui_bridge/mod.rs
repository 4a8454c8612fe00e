pub mod bridge;
pub mod console;
pub mod model;

pub use bridge::{gui_bind_address, GuiBridge};
pub use console::ConsoleRenderer;
pub use model::VisualizationModel;
