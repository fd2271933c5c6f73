use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::DecodeError;
use crate::models::{ProductId, Quantity, Update};

/// Row state of `products_on_hand` as captured by Debezium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StockState {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CdcPayload {
    /// State before the change (null for inserts)
    #[serde(default)]
    pub before: Option<StockState>,

    /// State after the change (null for deletes)
    #[serde(default)]
    pub after: Option<StockState>,
}

/// CDC message structure from Debezium
///
/// With `value.converter.schemas.enable = true` the payload is wrapped in a
/// `{"schema": ..., "payload": ...}` object, otherwise it is sent bare.
#[derive(Debug, Clone)]
pub enum CdcMessage {
    WithSchema { payload: CdcPayload },
    WithoutSchema(CdcPayload),
}

/// Split off the `payload` wrapper if there is one. A present `payload` field
/// always selects the wrapped shape.
fn unwrap_schema<T: DeserializeOwned>(raw: &[u8]) -> Result<(T, bool), DecodeError> {
    match serde_json::from_slice::<Value>(raw)? {
        Value::Object(mut map) if map.contains_key("payload") => {
            let payload = map.remove("payload").unwrap_or(Value::Null);
            Ok((serde_json::from_value(payload)?, true))
        }
        other => Ok((serde_json::from_value(other)?, false)),
    }
}

impl CdcMessage {
    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        let (payload, wrapped) = unwrap_schema::<CdcPayload>(raw)?;
        Ok(if wrapped {
            CdcMessage::WithSchema { payload }
        } else {
            CdcMessage::WithoutSchema(payload)
        })
    }

    pub fn payload(&self) -> &CdcPayload {
        match self {
            CdcMessage::WithSchema { payload } => payload,
            CdcMessage::WithoutSchema(payload) => payload,
        }
    }

    /// Validate the CDC message structure
    pub fn validate(&self) -> Result<(), DecodeError> {
        let payload = self.payload();

        match (&payload.before, &payload.after) {
            (None, None) => Err(DecodeError::EmptyPayload),
            (Some(before), Some(after)) if before.product_id != after.product_id => {
                Err(DecodeError::ProductIdMismatch {
                    before: before.product_id,
                    after: after.product_id,
                })
            }
            _ => Ok(()),
        }
    }

    /// Product id from whichever side is present
    pub fn product_id(&self) -> Option<ProductId> {
        let payload = self.payload();
        payload
            .after
            .as_ref()
            .or(payload.before.as_ref())
            .map(|state| state.product_id)
    }

    /// Convert a validated message into an `Update`
    pub fn to_update(&self) -> Result<Update, DecodeError> {
        self.validate()?;

        let payload = self.payload();
        let product_id = self.product_id().ok_or(DecodeError::EmptyPayload)?;

        Ok(Update {
            product_id,
            old_quantity: payload.before.map(|state| state.quantity),
            new_quantity: payload.after.map(|state| state.quantity),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct KeyPayload {
    pub product_id: ProductId,
}

/// Record key, carrying the primary key of the changed row
#[derive(Debug, Clone, Copy)]
pub enum CdcKey {
    WithSchema { payload: KeyPayload },
    WithoutSchema(KeyPayload),
}

impl CdcKey {
    pub fn product_id(&self) -> ProductId {
        match self {
            CdcKey::WithSchema { payload } => payload.product_id,
            CdcKey::WithoutSchema(payload) => payload.product_id,
        }
    }

    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        let (payload, wrapped) = unwrap_schema::<KeyPayload>(raw)?;
        Ok(if wrapped {
            CdcKey::WithSchema { payload }
        } else {
            CdcKey::WithoutSchema(payload)
        })
    }
}

/// Result of decoding one raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedRecord {
    /// Deleted row. The product id is recovered from the key when possible.
    Tombstone { product_id: Option<ProductId> },
    Update(Update),
}

pub fn is_tombstone(value: Option<&[u8]>) -> bool {
    value.map_or(true, |v| v.is_empty())
}

/// Decode a raw CDC record into an update or a tombstone.
pub fn decode_record(
    key: Option<&[u8]>,
    value: Option<&[u8]>,
) -> Result<DecodedRecord, DecodeError> {
    let key_product_id = match key.filter(|k| !k.is_empty()).map(CdcKey::parse) {
        Some(Ok(key)) => Some(key.product_id()),
        Some(Err(e)) => {
            warn!(error = %e, "Ignoring unparseable CDC record key");
            None
        }
        None => None,
    };

    let value = match value {
        Some(v) if !is_tombstone(Some(v)) => v,
        _ => {
            return Ok(DecodedRecord::Tombstone {
                product_id: key_product_id,
            })
        }
    };

    let message = CdcMessage::parse(value)?;
    let update = message.to_update()?;

    if let Some(key_id) = key_product_id {
        if key_id != update.product_id {
            return Err(DecodeError::KeyMismatch {
                key: key_id,
                payload: update.product_id,
            });
        }
    }

    Ok(DecodedRecord::Update(update))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn key(product_id: i64) -> Vec<u8> {
        bytes(json!({"payload": {"product_id": product_id}}))
    }

    #[test]
    fn test_decode_update_with_both_sides() {
        let value = bytes(json!({
            "payload": {
                "before": {"product_id": 123, "quantity": 5},
                "after": {"product_id": 123, "quantity": 10}
            }
        }));

        let decoded = decode_record(Some(key(123).as_slice()), Some(value.as_slice())).unwrap();
        assert_eq!(
            decoded,
            DecodedRecord::Update(Update::new(123, Some(5), Some(10)))
        );
    }

    #[test]
    fn test_decode_missing_before() {
        let value = bytes(json!({
            "payload": {"after": {"product_id": 123, "quantity": 10}}
        }));

        let decoded = decode_record(Some(key(123).as_slice()), Some(value.as_slice())).unwrap();
        assert_eq!(
            decoded,
            DecodedRecord::Update(Update::new(123, None, Some(10)))
        );
    }

    #[test]
    fn test_decode_missing_after() {
        let value = bytes(json!({
            "payload": {"before": {"product_id": 123, "quantity": 5}, "after": null}
        }));

        let decoded = decode_record(Some(key(123).as_slice()), Some(value.as_slice())).unwrap();
        assert_eq!(
            decoded,
            DecodedRecord::Update(Update::new(123, Some(5), None))
        );
    }

    #[test]
    fn test_decode_without_schema_wrapper() {
        let value = bytes(json!({
            "before": {"product_id": 7, "quantity": 0},
            "after": {"product_id": 7, "quantity": 3},
            "op": "u"
        }));
        let key = bytes(json!({"product_id": 7}));

        let decoded = decode_record(Some(key.as_slice()), Some(value.as_slice())).unwrap();
        assert_eq!(
            decoded,
            DecodedRecord::Update(Update::new(7, Some(0), Some(3)))
        );
    }

    #[test]
    fn test_decode_tombstone_recovers_key() {
        let decoded = decode_record(Some(key(123).as_slice()), None).unwrap();
        assert_eq!(
            decoded,
            DecodedRecord::Tombstone {
                product_id: Some(123)
            }
        );

        let decoded = decode_record(Some(key(123).as_slice()), Some(&b""[..])).unwrap();
        assert_eq!(
            decoded,
            DecodedRecord::Tombstone {
                product_id: Some(123)
            }
        );
    }

    #[test]
    fn test_decode_tombstone_without_usable_key() {
        assert_eq!(
            decode_record(None, None).unwrap(),
            DecodedRecord::Tombstone { product_id: None }
        );
        assert_eq!(
            decode_record(Some(&b"not json"[..]), None).unwrap(),
            DecodedRecord::Tombstone { product_id: None }
        );
    }

    #[test]
    fn test_blank_payload_is_rejected() {
        let value = bytes(json!({"payload": {}}));

        let err = decode_record(Some(key(123).as_slice()), Some(value.as_slice())).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyPayload));
    }

    #[test]
    fn test_changed_product_id_is_rejected() {
        let value = bytes(json!({
            "payload": {
                "before": {"product_id": 123, "quantity": 1},
                "after": {"product_id": 456, "quantity": 1}
            }
        }));

        let err = decode_record(Some(key(456).as_slice()), Some(value.as_slice())).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ProductIdMismatch {
                before: 123,
                after: 456
            }
        ));
    }

    #[test]
    fn test_key_mismatch_is_rejected() {
        let value = bytes(json!({
            "payload": {"after": {"product_id": 123, "quantity": 1}}
        }));

        let err = decode_record(Some(key(999).as_slice()), Some(value.as_slice())).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::KeyMismatch {
                key: 999,
                payload: 123
            }
        ));
    }

    #[test]
    fn test_unparseable_key_is_ignored_for_updates() {
        let value = bytes(json!({
            "payload": {"after": {"product_id": 123, "quantity": 1}}
        }));

        let decoded = decode_record(Some(&b"garbage"[..]), Some(value.as_slice())).unwrap();
        assert_eq!(
            decoded,
            DecodedRecord::Update(Update::new(123, None, Some(1)))
        );
    }

    #[test]
    fn test_malformed_value_is_rejected() {
        let err = decode_record(Some(key(1).as_slice()), Some(&b"{not json"[..])).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let value = bytes(json!({
            "payload": {"after": {"product_id": 1, "quantity": -4}}
        }));

        let err = decode_record(None, Some(value.as_slice())).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));
    }
}
