use crate::domain::events::NotificationEvent;
use tokio::sync::broadcast;
use tracing::info;

/// Receives informational events. Delivery is best effort.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}

/// Writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, event: NotificationEvent) {
        info!(event = "notification", "{}", event.summary());
    }
}

impl NotificationSink for broadcast::Sender<NotificationEvent> {
    fn notify(&self, event: NotificationEvent) {
        // No subscribers is fine.
        let _ = self.send(event);
    }
}

/// Fans each event out to several sinks.
#[derive(Default)]
pub struct MultiNotifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl MultiNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl NotificationSink for MultiNotifier {
    fn notify(&self, event: NotificationEvent) {
        for sink in &self.sinks {
            sink.notify(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_notifier_fans_out() {
        let (tx, mut rx) = broadcast::channel(4);
        let notifier = MultiNotifier::new().with(LogNotifier).with(tx);

        notifier.notify(NotificationEvent::ShowRestored {
            name: "show a".to_string(),
        });

        assert_eq!(
            rx.try_recv().unwrap(),
            NotificationEvent::ShowRestored {
                name: "show a".to_string()
            }
        );
    }
}
