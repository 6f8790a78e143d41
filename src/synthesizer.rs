use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::models::{Delivery, OrderItem, OrderRecord, Payment};

// ============================================================================
// Record Synthesizer
// ============================================================================
//
// Builds structurally valid orders. Every call draws fresh v4 UUIDs for the
// order id, the payment transaction and each item rid; nothing is derived
// from a counter, so concurrent harness runs cannot collide.
//
// Template mode copies the reference order verbatim apart from identifiers.
// Randomized mode varies item count, prices and discounts for feed runs.
//
// ============================================================================

/// 2021-11-26T06:22:19Z
const TEMPLATE_CREATED_AT: i64 = 1_637_907_739;
const TEMPLATE_PAID_AT: i64 = 1_637_907_727;
const TRACK_NUMBER: &str = "WBILMTESTTRACK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    Template,
    Randomized,
}

#[derive(Debug, Clone)]
pub struct RecordSynthesizer {
    mode: SynthesisMode,
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

impl RecordSynthesizer {
    pub fn new(mode: SynthesisMode) -> Self {
        Self { mode }
    }

    pub fn template() -> Self {
        Self::new(SynthesisMode::Template)
    }

    pub fn synthesize(&self) -> OrderRecord {
        match self.mode {
            SynthesisMode::Template => template_record(),
            SynthesisMode::Randomized => randomized_record(&mut rand::rng()),
        }
    }
}

fn template_delivery() -> Delivery {
    Delivery {
        name: "Test Testov".to_string(),
        phone: "+9720000000".to_string(),
        postal_code: "2639809".to_string(),
        city: "Kiryat Mozkin".to_string(),
        street_address: "Ploshad Mira 15".to_string(),
        region: "Kraiot".to_string(),
        email: "test@gmail.com".to_string(),
    }
}

fn template_record() -> OrderRecord {
    OrderRecord {
        order_id: fresh_id(),
        tracking_number: TRACK_NUMBER.to_string(),
        entry: "WBIL".to_string(),
        delivery: template_delivery(),
        payment: Payment {
            transaction_id: fresh_id(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            paid_at: TEMPLATE_PAID_AT,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![OrderItem {
            catalog_id: 9_934_930,
            track_number: TRACK_NUMBER.to_string(),
            price: 453,
            rid: fresh_id(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shard_key: "9".to_string(),
        source_market_id: 99,
        created_at: DateTime::from_timestamp(TEMPLATE_CREATED_AT, 0).unwrap_or_default(),
        region_shard: "1".to_string(),
    }
}

fn randomized_record<R: Rng + ?Sized>(rng: &mut R) -> OrderRecord {
    let order_id = fresh_id();
    let now = Utc::now();
    let created_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);

    let item_count = rng.random_range(1..=3);
    let items: Vec<OrderItem> = (0..item_count)
        .map(|_| {
            let price: u64 = rng.random_range(100..2100);
            let sale: u32 = rng.random_range(0..50);
            OrderItem {
                catalog_id: rng.random_range(1..=1_000_000),
                track_number: format!("TRK{:06}", rng.random_range(0..1_000_000)),
                price,
                rid: fresh_id(),
                name: format!("Item-{}", rng.random_range(0..1000)),
                sale,
                size: "M".to_string(),
                total_price: price * u64::from(100 - sale) / 100,
                nm_id: rng.random_range(0..1_000_000),
                brand: "BrandX".to_string(),
                status: 202,
            }
        })
        .collect();

    let goods_total: u64 = items.iter().map(|item| item.total_price).sum();
    let delivery_cost: u64 = rng.random_range(0..2000);

    OrderRecord {
        tracking_number: format!("TRACK-{}", &order_id[..8]),
        entry: "WEB".to_string(),
        delivery: template_delivery(),
        payment: Payment {
            transaction_id: fresh_id(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: goods_total + delivery_cost,
            paid_at: created_at.timestamp(),
            bank: "alpha".to_string(),
            delivery_cost,
            goods_total,
            custom_fee: 0,
        },
        items,
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: format!("cust-{}", rng.random_range(0..100_000)),
        delivery_service: "meest".to_string(),
        shard_key: rng.random_range(0..10).to_string(),
        source_market_id: rng.random_range(0..1000),
        created_at,
        region_shard: "1".to_string(),
        order_id,
    }
}
