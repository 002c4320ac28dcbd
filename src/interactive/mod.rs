//! Interactive preview of environment, irradiance and blur output

mod viewer;

pub use viewer::{InteractiveViewer, ViewerConfig};
