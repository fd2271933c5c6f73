mod consumer;
mod models;

pub use consumer::{KafkaSourceConfig, KafkaUpdateSource};
pub use models::{
    decode_record, is_tombstone, CdcKey, CdcMessage, CdcPayload, DecodedRecord, KeyPayload,
    StockState,
};
