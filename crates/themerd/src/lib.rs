//! Konsole theme daemon library - exposes modules for testing.

pub mod appearance;
pub mod applicator;
pub mod command;
pub mod discovery;
pub mod konsole;
pub mod reconcile;
pub mod signals;
pub mod watcher;
