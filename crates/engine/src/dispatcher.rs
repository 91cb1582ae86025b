//! Dispatch coordinator: bounded concurrent fan-out of one message to all
//! authorized chats.
//!
//! The coordinator is a full barrier: it returns only after every recipient
//! has produced an outcome. Completion order never leaks into the result:
//! outcomes are keyed by snapshot index and re-sorted before returning.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;

use herald_common::types::{Chat, DeliveryOutcome, Service};

use crate::transport::MessageTransport;

/// Format the outbound text: service name, separator, trimmed message.
/// Pure; computed once per dispatch so every recipient gets identical text.
pub fn format_message(service_name: &str, message: &str) -> String {
    format!("{service_name}: {message}")
}

/// Result of one dispatch run: the exact text that was transmitted plus one
/// outcome per target chat, in snapshot order.
#[derive(Debug)]
pub struct DispatchOutput {
    pub formatted_text: String,
    pub outcomes: Vec<DeliveryOutcome>,
}

pub struct Dispatcher {
    transport: Arc<dyn MessageTransport>,
    concurrency: usize,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        concurrency: usize,
        send_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            concurrency: concurrency.max(1),
            send_timeout,
        }
    }

    /// Send `message` to every chat in the snapshot, at most `concurrency`
    /// calls in flight, each bounded by `send_timeout`.
    ///
    /// One delivery attempt per recipient, no retries. A failure or timeout
    /// on one recipient is captured as a `Failed` outcome for that slot and
    /// never cancels the siblings.
    pub async fn dispatch(
        &self,
        service: &Service,
        message: &str,
        chats: &[Chat],
    ) -> DispatchOutput {
        let formatted_text = format_message(&service.name, message);

        let sends: Vec<_> = chats
            .iter()
            .enumerate()
            .map(|(idx, chat)| {
                let transport = Arc::clone(&self.transport);
                let text = formatted_text.as_str();
                let timeout = self.send_timeout;
                let telegram_id = chat.telegram_id;
                async move {
                    let outcome = match tokio::time::timeout(
                        timeout,
                        transport.send_message(telegram_id, text),
                    )
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => DeliveryOutcome::Failed {
                            error: format!("send timed out after {}s", timeout.as_secs()),
                        },
                    };
                    (idx, outcome)
                }
            })
            .collect();

        let mut indexed: Vec<(usize, DeliveryOutcome)> = stream::iter(sends)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        indexed.sort_by_key(|(idx, _)| *idx);

        let outcomes: Vec<DeliveryOutcome> =
            indexed.into_iter().map(|(_, outcome)| outcome).collect();

        tracing::debug!(
            service = %service.name,
            recipients = chats.len(),
            successful = outcomes.iter().filter(|o| o.is_success()).count(),
            "Dispatch batch completed"
        );

        DispatchOutput {
            formatted_text,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    use crate::transport::TransportError;
    use herald_common::types::{ChatType, DiscoveredChat};

    /// Transport double: succeeds with `message_id = telegram_id * 10`,
    /// fails for ids in `fail_ids`, sleeps `delay` before answering, and
    /// tracks the peak number of in-flight calls.
    struct MockTransport {
        delay: Duration,
        fail_ids: HashSet<i64>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl MockTransport {
        fn new(delay: Duration, fail_ids: impl IntoIterator<Item = i64>) -> Self {
            Self {
                delay,
                fail_ids: fail_ids.into_iter().collect(),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MessageTransport for MockTransport {
        async fn send_message(&self, chat_id: i64, _text: &str) -> DeliveryOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_ids.contains(&chat_id) {
                DeliveryOutcome::Failed {
                    error: "bot was blocked by the user".to_string(),
                }
            } else {
                DeliveryOutcome::Delivered {
                    message_id: chat_id * 10,
                }
            }
        }

        async fn discover_chats(&self) -> Result<Vec<DiscoveredChat>, TransportError> {
            Ok(Vec::new())
        }
    }

    fn make_service(name: &str) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: name.to_string(),
            label: None,
            description: None,
            api_key: "k".repeat(32),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_chats(telegram_ids: &[i64]) -> Vec<Chat> {
        telegram_ids
            .iter()
            .map(|&telegram_id| Chat {
                id: Uuid::new_v4(),
                telegram_id,
                title: format!("chat-{telegram_id}"),
                username: None,
                chat_type: ChatType::Group,
                label: None,
                description: None,
                is_tester: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_format_message_is_deterministic() {
        assert_eq!(
            format_message("Monitor", "Server is down"),
            "Monitor: Server is down"
        );
        assert_eq!(
            format_message("Monitor", "Server is down"),
            format_message("Monitor", "Server is down")
        );
    }

    #[tokio::test]
    async fn test_one_outcome_per_recipient_in_snapshot_order() {
        let transport = Arc::new(MockTransport::new(Duration::ZERO, [222, 444]));
        let dispatcher = Dispatcher::new(transport.clone(), 5, Duration::from_secs(30));
        let chats = make_chats(&[111, 222, 333, 444, 555]);

        let output = dispatcher
            .dispatch(&make_service("Monitor"), "hello", &chats)
            .await;

        assert_eq!(output.formatted_text, "Monitor: hello");
        assert_eq!(output.outcomes.len(), chats.len());
        assert_eq!(
            output.outcomes[0],
            DeliveryOutcome::Delivered { message_id: 1110 }
        );
        assert!(!output.outcomes[1].is_success());
        assert_eq!(
            output.outcomes[2],
            DeliveryOutcome::Delivered { message_id: 3330 }
        );
        assert!(!output.outcomes[3].is_success());
        assert_eq!(
            output.outcomes[4],
            DeliveryOutcome::Delivered { message_id: 5550 }
        );
        assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_concurrency_bound_respected() {
        let transport = Arc::new(MockTransport::new(Duration::from_millis(30), []));
        let dispatcher = Dispatcher::new(transport.clone(), 5, Duration::from_secs(30));
        let ids: Vec<i64> = (1..=20).collect();
        let chats = make_chats(&ids);

        let output = dispatcher
            .dispatch(&make_service("Monitor"), "load test", &chats)
            .await;

        assert_eq!(output.outcomes.len(), 20);
        assert!(output.outcomes.iter().all(|o| o.is_success()));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 20);
        assert!(transport.peak_in_flight.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_timeout_is_isolated_to_slow_recipient() {
        struct SlowOne;

        #[async_trait]
        impl MessageTransport for SlowOne {
            async fn send_message(&self, chat_id: i64, _text: &str) -> DeliveryOutcome {
                if chat_id == 111 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                DeliveryOutcome::Delivered {
                    message_id: chat_id * 10,
                }
            }

            async fn discover_chats(&self) -> Result<Vec<DiscoveredChat>, TransportError> {
                Ok(Vec::new())
            }
        }

        tokio::time::pause();
        let dispatcher = Dispatcher::new(Arc::new(SlowOne), 5, Duration::from_millis(100));
        let chats = make_chats(&[111, 222]);

        let output = dispatcher
            .dispatch(&make_service("Monitor"), "hello", &chats)
            .await;

        assert_eq!(output.outcomes.len(), 2);
        assert!(!output.outcomes[0].is_success());
        assert!(
            output.outcomes[0]
                .error()
                .is_some_and(|e| e.contains("timed out"))
        );
        assert_eq!(
            output.outcomes[1],
            DeliveryOutcome::Delivered { message_id: 2220 }
        );
    }

    #[tokio::test]
    async fn test_empty_snapshot_makes_no_calls() {
        let transport = Arc::new(MockTransport::new(Duration::ZERO, []));
        let dispatcher = Dispatcher::new(transport.clone(), 5, Duration::from_secs(30));

        let output = dispatcher
            .dispatch(&make_service("Monitor"), "hello", &[])
            .await;

        assert!(output.outcomes.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
