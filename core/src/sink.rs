use crate::models::SpikeSignal;

/// Ingress for spike signals. Monitors hold one of these and call it
/// synchronously from their tick; implementations must not perform I/O.
pub trait SignalSink: Send + Sync + 'static {
    fn register_signal(&self, signal: SpikeSignal);
}
