mod consolidate;

pub use consolidate::*;
