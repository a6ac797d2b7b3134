mod classifier;

pub use classifier::{classify, ConsoleEvent};
