pub use animation::{Animation, Filter, Loops, OnFinish, Transition, TransitionOptions};
pub use easing::Easing;

mod animation;
mod easing;
