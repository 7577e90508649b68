use tracing::subscriber::set_global_default;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Initialize a process-global `tracing` subscriber for a binary entry
/// point (bench harness, example, or an embedder's own `main`). The engine
/// crate itself never calls this — only call-site instrumentation lives
/// there, matching the teacher's split between a `tracer` init crate and
/// library crates that just emit events.
pub fn init_tracing(log_level: Option<&str>) {
    let env_filter = EnvFilter::new(log_level.unwrap_or("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().pretty();

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    // Bridge the `log` crate into `tracing` so any dependency that still
    // logs via `log::*` shows up in the same stream.
    let _ = tracing_log::LogTracer::init();

    set_global_default(subscriber).expect("failed to set global tracing subscriber");
}

#[cfg(test)]
mod tests {}
