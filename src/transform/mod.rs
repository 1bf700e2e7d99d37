//! Per-artifact post-processing pipeline.
//!
//! Stages run in order, each feeding its output to the next. A failing stage drops that
//! one artifact; the other artifacts of the same job are unaffected.

pub mod fs;

use log::debug;

use crate::error::TransformError;

pub use fs::{CopyTo, MoveTo, Remove};

pub trait Transform<T>: Send + Sync {
    /// Short stage name for logs.
    fn name(&self) -> &'static str;

    fn apply(&self, item: T) -> Result<T, TransformError>;
}

pub struct Pipeline<T> {
    stages: Vec<Box<dyn Transform<T>>>,
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<T> Pipeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage (builder style).
    pub fn with<S>(mut self, stage: S) -> Self
    where
        S: Transform<T> + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push<S>(&mut self, stage: S)
    where
        S: Transform<T> + 'static,
    {
        self.stages.push(Box::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Feed `item` through every stage. `None` if a stage failed.
    pub fn run(&self, item: T) -> Option<T> {
        let mut item = item;
        for stage in &self.stages {
            match stage.apply(item) {
                Ok(next) => item = next,
                Err(e) => {
                    debug!("transform {} dropped artifact: {}", stage.name(), e);
                    return None;
                }
            }
        }
        Some(item)
    }
}
