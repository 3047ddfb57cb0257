//! Application model: the `App` and `Scene` hook traits, actors, the
//! per-frame `Context` and the `Engine` that drives them.

mod actor;
mod app;
mod ctx;
mod engine;

pub use actor::{Actor, ActorControl, ActorPool, UpdatePass};
pub use app::{App, Scene, StartupScene};
pub use ctx::Context;
pub use engine::{Engine, EngineConfig, FrameReport};

#[cfg(test)]
mod tests;
