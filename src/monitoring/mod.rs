/*!
 * Monitoring
 * Memory telemetry and structured tracing
 */

mod telemetry;
mod tracer;

pub use telemetry::{TelemetryMonitor, TelemetryOutcome, TelemetryStats};
pub use tracer::{generate_trace_id, init_tracing, span_operation, OperationSpan};
