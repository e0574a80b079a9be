pub mod runtime;

pub use runtime::{parse_major_version, JavaRuntime, RuntimeRegistry};
