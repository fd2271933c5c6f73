//! Raw Debezium records through the codec and into the notifier.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use stock_notifier::services::cdc::{decode_record, DecodedRecord};
use stock_notifier::services::{encode_notification, InMemoryNotificationSink};
use stock_notifier::{Notifier, Shutdown, SourceError, Update, UpdateSource};
use tokio::sync::Mutex;

type RawRecord = (Option<Vec<u8>>, Option<Vec<u8>>);

/// Source that decodes raw key/value pairs the way a broker-backed one does
struct RawRecordSource {
    records: Mutex<Vec<RawRecord>>,
}

impl RawRecordSource {
    fn new(mut records: Vec<RawRecord>) -> Self {
        records.reverse();
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl UpdateSource for RawRecordSource {
    async fn read_update(&self, _shutdown: &Shutdown) -> Result<Option<Update>, SourceError> {
        let (key, value) = self
            .records
            .lock()
            .await
            .pop()
            .ok_or(SourceError::EndOfStream)?;

        match decode_record(key.as_deref(), value.as_deref())? {
            DecodedRecord::Update(update) => Ok(Some(update)),
            DecodedRecord::Tombstone { .. } => Ok(None),
        }
    }
}

fn key(product_id: i64) -> Option<Vec<u8>> {
    Some(serde_json::to_vec(&json!({"payload": {"product_id": product_id}})).unwrap())
}

fn value(payload: serde_json::Value) -> Option<Vec<u8>> {
    Some(serde_json::to_vec(&json!({ "payload": payload })).unwrap())
}

#[tokio::test]
async fn test_raw_records_to_wire_notifications() {
    let source = Arc::new(RawRecordSource::new(vec![
        // out of stock
        (
            key(123),
            value(json!({
                "before": {"product_id": 123, "quantity": 10},
                "after": {"product_id": 123, "quantity": 0}
            })),
        ),
        // malformed: empty payload
        (key(123), value(json!({}))),
        // delete followed by its tombstone
        (
            key(123),
            value(json!({"before": {"product_id": 123, "quantity": 0}, "after": null})),
        ),
        (key(123), None),
        // malformed: product id changed
        (
            key(456),
            value(json!({
                "before": {"product_id": 123, "quantity": 1},
                "after": {"product_id": 456, "quantity": 1}
            })),
        ),
        // back in stock
        (
            key(456),
            value(json!({
                "before": {"product_id": 456, "quantity": 0},
                "after": {"product_id": 456, "quantity": 7}
            })),
        ),
    ]));
    let sink = Arc::new(InMemoryNotificationSink::new());

    let summary = Notifier::new(source, Arc::clone(&sink))
        .run(&Shutdown::never())
        .await
        .unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.notified, 2);
    assert_eq!(summary.source_errors, 2);

    let wire: Vec<String> = sink
        .written()
        .iter()
        .map(|n| String::from_utf8(encode_notification(n).unwrap()).unwrap())
        .collect();
    assert_eq!(
        wire,
        vec![
            r#"{"type":"OutOfStock","product_id":123,"quantity":0}"#.to_string(),
            r#"{"type":"BackInStock","product_id":456,"quantity":7}"#.to_string(),
        ]
    );
}
