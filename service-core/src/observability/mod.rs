pub mod logging;
pub mod trace_context;

pub use logging::{LogFormat, init_tracing};
pub use trace_context::{TRACEPARENT_HEADER, TracedClientExt, TracedRequest, inject_trace_context};
