pub mod collision;
pub mod controller;
pub mod dialogue;
pub mod hooks;
pub mod level;
pub mod replay;
pub mod session;
pub mod world;

pub use hooks::{LevelHost, LogHost, Navigation};
pub use level::{load_level_from_path, LevelFile, LevelWatcher};
pub use session::LevelSession;
