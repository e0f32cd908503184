//! Integration tests for events

#[cfg(test)]
mod tests {
    use hotswap_errors::{Error, UpdateError};
    use hotswap_events::*;

    #[tokio::test]
    async fn test_event_sender_emit() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, AppEvent::General(GeneralEvent::Error { .. })));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::General(GeneralEvent::Debug { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_absent_sender_is_silent() {
        let sender: Option<EventSender> = None;
        sender.emit_warning("nowhere");
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = AppEvent::Update(UpdateEvent::FirstRun { hash: "abc".into() });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "update");
        assert_eq!(json["event"]["type"], "FirstRun");
        assert_eq!(json["event"]["hash"], "abc");
    }

    #[test]
    fn test_log_levels_and_meta() {
        let rolled_back = AppEvent::Update(UpdateEvent::RolledBack {
            failed_hash: "v2".into(),
            restored: Some("v1".into()),
        });
        assert_eq!(rolled_back.log_level(), tracing::Level::WARN);
        let meta = rolled_back.meta();
        assert_eq!(meta.correlation_id.as_deref(), Some("v2"));
        assert_eq!(meta.source, EventSource::Update);
        assert_eq!(meta.level, EventLevel::Warn);

        let progress = AppEvent::Download(DownloadEvent::Progress {
            url: "https://example.com".into(),
            received_bytes: 1,
            total_bytes: 2,
        });
        assert_eq!(progress.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_operation_finished_level_follows_failure() {
        let (tx, mut rx) = channel();
        tx.emit_operation_finished("install", None);
        tx.emit_operation_finished(
            "download",
            Some(FailureContext {
                code: Some("network.download_incomplete".into()),
                message: "connection reset".into(),
                hint: None,
                retryable: true,
            }),
        );

        let ok = rx.try_recv().unwrap();
        assert_eq!(ok.log_level(), tracing::Level::INFO);
        let failed = rx.try_recv().unwrap();
        assert_eq!(failed.meta().level, EventLevel::Error);
        assert_eq!(failed.meta().source.as_str(), "general");
    }

    #[test]
    fn test_failure_context_from_error() {
        let err: Error = UpdateError::HashMismatch {
            expected: "a".into(),
            actual: "b".into(),
        }
        .into();
        let failure = FailureContext::from_error(&err);
        assert_eq!(failure.code.as_deref(), Some("update.hash_mismatch"));
        assert!(!failure.retryable);
        assert!(failure.hint.is_some());
    }
}
