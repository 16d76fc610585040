// Author: Dustin Pilgrim
// License: MIT

pub mod model;
pub mod parser;

pub use model::QuiesceConfig;
pub use parser::load_config;
