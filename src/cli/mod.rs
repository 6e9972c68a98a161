pub mod commands;
pub mod ui;
pub mod util;

pub use ui::Output;
pub use util::{load_config, read_facts, write_text};
