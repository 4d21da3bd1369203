use async_trait::async_trait;
use coordinator::Notifier;
use tracing::info;

/// Writes alerts to the `alerts` log target. Used when no webhook is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        info!(target: "alerts", %message, "alert");
        Ok(())
    }
}
