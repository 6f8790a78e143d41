use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

// ============================================================================
// Order Record - the payload published to the bus and read back over HTTP
// ============================================================================
//
// Field names on the wire follow the order service's JSON schema, so the
// Rust names and the serialized names differ in a few places (order_uid,
// transaction, shardkey, sm_id, oof_shard, date_created).
//
// Records are plain values: built once by the synthesizer, then only ever
// borrowed by the publisher and compared by the harness.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderRecord {
    #[serde(rename = "order_uid")]
    pub order_id: String,
    #[serde(rename = "track_number")]
    pub tracking_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<OrderItem>,
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    #[serde(rename = "shardkey")]
    pub shard_key: String,
    #[serde(rename = "sm_id")]
    pub source_market_id: i64,
    #[serde(rename = "date_created")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "oof_shard")]
    pub region_shard: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    #[serde(rename = "zip")]
    pub postal_code: String,
    pub city: String,
    #[serde(rename = "address")]
    pub street_address: String,
    pub region: String,
    pub email: String,
}

/// Monetary amounts are integers in minor units.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Payment {
    #[serde(rename = "transaction")]
    pub transaction_id: String,
    #[serde(default)]
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: u64,
    #[serde(rename = "payment_dt")]
    pub paid_at: i64,
    pub bank: String,
    pub delivery_cost: u64,
    pub goods_total: u64,
    pub custom_fee: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    #[serde(rename = "chrt_id")]
    pub catalog_id: i64,
    pub track_number: String,
    pub price: u64,
    pub rid: String,
    pub name: String,
    /// Discount percentage
    pub sale: u32,
    pub size: String,
    pub total_price: u64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("order id is empty")]
    MissingOrderId,

    #[error("payment transaction id is empty")]
    MissingTransactionId,

    #[error("order has no items")]
    EmptyItems,

    #[error("item {0} has an empty rid")]
    MissingItemRid(usize),
}

impl OrderRecord {
    /// Structural presence check for the identifiers the pipeline keys on.
    pub fn check_shape(&self) -> Result<(), ShapeError> {
        if self.order_id.is_empty() {
            return Err(ShapeError::MissingOrderId);
        }
        if self.payment.transaction_id.is_empty() {
            return Err(ShapeError::MissingTransactionId);
        }
        if self.items.is_empty() {
            return Err(ShapeError::EmptyItems);
        }
        if let Some(index) = self.items.iter().position(|item| item.rid.is_empty()) {
            return Err(ShapeError::MissingItemRid(index));
        }
        Ok(())
    }

    /// Differences in identifying fields between a published record and the
    /// one the query endpoint returned. Descriptive fields are ignored since
    /// the service may normalize them.
    pub fn identity_diff(&self, fetched: &OrderRecord) -> Vec<String> {
        let mut diffs = Vec::new();

        if self.order_id != fetched.order_id {
            diffs.push(format!(
                "order_uid: published {} fetched {}",
                self.order_id, fetched.order_id
            ));
        }
        if self.payment.transaction_id != fetched.payment.transaction_id {
            diffs.push(format!(
                "payment.transaction: published {} fetched {}",
                self.payment.transaction_id, fetched.payment.transaction_id
            ));
        }
        if self.items.len() != fetched.items.len() {
            diffs.push(format!(
                "items: published {} fetched {}",
                self.items.len(),
                fetched.items.len()
            ));
        } else {
            for (index, (ours, theirs)) in self.items.iter().zip(&fetched.items).enumerate() {
                if ours.rid != theirs.rid {
                    diffs.push(format!(
                        "items[{}].rid: published {} fetched {}",
                        index, ours.rid, theirs.rid
                    ));
                }
            }
        }

        diffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesizer::RecordSynthesizer;

    #[test]
    fn test_wire_field_names() {
        let record = RecordSynthesizer::template().synthesize();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["order_uid"], record.order_id.as_str());
        assert_eq!(json["payment"]["transaction"], record.payment.transaction_id.as_str());
        assert_eq!(json["items"][0]["rid"], record.items[0].rid.as_str());
        assert_eq!(json["delivery"]["zip"], "2639809");
        assert_eq!(json["sm_id"], 99);
        assert_eq!(json["date_created"], "2021-11-26T06:22:19Z");
        assert!(json.get("order_id").is_none());
    }

    #[test]
    fn test_deserialize_ignores_server_metadata() {
        let record = RecordSynthesizer::template().synthesize();
        let mut json = serde_json::to_value(&record).unwrap();
        json["cached_at"] = serde_json::json!("2024-01-01T00:00:00Z");
        json["delivery"]["delivery_id"] = serde_json::json!(17);

        let parsed: OrderRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_deserialize_rejects_missing_items() {
        let record = RecordSynthesizer::template().synthesize();
        let mut json = serde_json::to_value(&record).unwrap();
        json.as_object_mut().unwrap().remove("items");

        assert!(serde_json::from_value::<OrderRecord>(json).is_err());
    }

    #[test]
    fn test_check_shape() {
        let record = RecordSynthesizer::template().synthesize();
        assert_eq!(record.check_shape(), Ok(()));

        let mut no_items = record.clone();
        no_items.items.clear();
        assert_eq!(no_items.check_shape(), Err(ShapeError::EmptyItems));

        let mut no_id = record.clone();
        no_id.order_id.clear();
        assert_eq!(no_id.check_shape(), Err(ShapeError::MissingOrderId));

        let mut no_tx = record.clone();
        no_tx.payment.transaction_id.clear();
        assert_eq!(no_tx.check_shape(), Err(ShapeError::MissingTransactionId));

        let mut no_rid = record;
        no_rid.items[0].rid.clear();
        assert_eq!(no_rid.check_shape(), Err(ShapeError::MissingItemRid(0)));
    }

    #[test]
    fn test_identity_diff() {
        let published = RecordSynthesizer::template().synthesize();
        assert!(published.identity_diff(&published.clone()).is_empty());

        let mut fetched = published.clone();
        fetched.locale = "ru".to_string();
        assert!(published.identity_diff(&fetched).is_empty());

        fetched.items[0].rid = "other".to_string();
        fetched.payment.transaction_id = "other".to_string();
        let diffs = published.identity_diff(&fetched);
        assert_eq!(diffs.len(), 2);
        assert!(diffs[0].starts_with("payment.transaction"));
        assert!(diffs[1].starts_with("items[0].rid"));
    }
}
