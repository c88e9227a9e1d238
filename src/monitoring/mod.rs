/*!
 * Monitoring
 * Structured logging setup and process spans
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, ProcessSpan, TRACE_JSON_ENV};
