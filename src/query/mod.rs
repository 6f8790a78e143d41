mod client;

pub use client::{HttpQueryClient, OrderQuery, QueryError, QueryOutcome};
