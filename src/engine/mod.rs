// FILE: src/engine/mod.rs
pub mod classifier;
pub mod dispatch;

pub use classifier::{Classifier, ClassificationRecord, Identification};
pub use dispatch::{Dispatcher, Handler, MovableEntry};
