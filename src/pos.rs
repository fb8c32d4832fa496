//! Point-of-sale extension
//!
//! Two fixed-shape calls layered on the generic client. The POS client wraps
//! a [`Client`] by composition and exposes it for everything else; the
//! results of both calls are returned exactly as the server shaped them.

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::Result;
use serde_json::{json, Map, Value};

/// Default number of orders retrieved by [`PosClient::get_pos_orders`].
pub const DEFAULT_ORDER_LIMIT: u32 = 10;

/// Client for point-of-sale data retrieval.
pub struct PosClient {
    client: Client,
}

impl PosClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::new(Client::new(config)?))
    }

    /// The wrapped generic client, for everything beyond the POS calls.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn authenticate(&self) -> Result<i64> {
        self.client.authenticate().await
    }

    /// Retrieve the POS configurations registered for `db`.
    ///
    /// Returns the server's list of configuration records unvalidated.
    pub async fn get_pos_data(&self, db: &str, include_inactive: bool) -> Result<Value> {
        self.client
            .execute(
                "pos.config",
                "get_pos_data",
                vec![json!(db), json!(include_inactive)],
                Map::new(),
            )
            .await
    }

    /// Retrieve orders for one POS configuration.
    ///
    /// `pos` accepts either a bare configuration id or a configuration record
    /// (the id is taken from its `"id"` key); both produce the identical call
    /// shape. The result is a mapping that may carry `"oldest"`, `"newest"`
    /// and `"all"` keys, each a list of order records, returned unvalidated.
    pub async fn get_pos_orders(
        &self,
        pos: impl Into<PosConfigRef>,
        db: &str,
        limit: u32,
        include_lines: bool,
    ) -> Result<Value> {
        let pos_id = pos.into().id();
        self.client
            .execute(
                "pos.order",
                "get_pos_orders",
                vec![pos_id, json!(db), json!(limit), json!(include_lines)],
                Map::new(),
            )
            .await
    }
}

/// A POS configuration reference: a bare id, or a record to take the id from.
#[derive(Debug, Clone)]
pub enum PosConfigRef {
    Id(i64),
    Record(Map<String, Value>),
}

impl PosConfigRef {
    /// The id sent on the wire; a record without an `"id"` key yields nil.
    fn id(&self) -> Value {
        match self {
            PosConfigRef::Id(id) => json!(id),
            PosConfigRef::Record(record) => record.get("id").cloned().unwrap_or(Value::Null),
        }
    }
}

impl From<i64> for PosConfigRef {
    fn from(id: i64) -> Self {
        PosConfigRef::Id(id)
    }
}

impl From<Map<String, Value>> for PosConfigRef {
    fn from(record: Map<String, Value>) -> Self {
        PosConfigRef::Record(record)
    }
}
