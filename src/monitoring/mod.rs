/*!
 * Monitoring
 * Structured logging setup and per-grant tracing spans
 */

mod tracer;

pub use tracer::{init_tracing, try_init_tracing, GrantSpan, TRACE_JSON_ENV};
