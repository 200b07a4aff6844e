pub mod animation;
pub mod input;
pub mod scheduler;
pub mod time;

pub use animation::{AnimationPlayer, FrameSet};
pub use input::{InputState, Key};
pub use scheduler::{Scheduler, TimerId};
pub use time::FrameClock;
