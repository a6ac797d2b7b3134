mod color;

pub use color::{parse, strip_codes, ColoredSpan, SpanColor};
