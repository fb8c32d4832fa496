//! Generic client: authentication, generic dispatch, convenience verbs
//!
//! Every operation is a single blocking round trip against one of two
//! endpoints derived from the base URL: `/xmlrpc/2/common` for session calls
//! and `/xmlrpc/2/object` for generic `execute_kw` dispatch. The convenience
//! verbs are pure shape adapters over [`Client::execute`]; no client-side
//! validation of domains or field names is attempted.

use crate::config::ClientConfig;
use crate::error::{ErpxError, Result};
use crate::session::{CredentialKey, SessionCache};
use crate::xmlrpc::Endpoint;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

/// Fixed login sent for API-key authentication.
pub const API_KEY_LOGIN: &str = "admin";

const COMMON_SUFFIX: &str = "xmlrpc/2/common";
const OBJECT_SUFFIX: &str = "xmlrpc/2/object";

/// Client for a single server, holding one long-lived transport handle per
/// endpoint class and a process-local session cache.
///
/// All methods take `&self`; the session state is lock-guarded, so the client
/// can be shared between tasks.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    common: Endpoint,
    object: Endpoint,
    sessions: SessionCache,
    uid: RwLock<Option<i64>>,
}

impl Client {
    /// Build a client from its configuration.
    ///
    /// Both endpoint handles are created here and share one HTTP client with
    /// the configured per-call timeout.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = Url::parse(&format!("{}/", config.url))
            .map_err(|e| ErpxError::Config(format!("Invalid base URL '{}': {}", config.url, e)))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ErpxError::Config(format!(
                "Unsupported URL scheme '{}': expected http or https",
                base.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let join = |suffix: &str| {
            base.join(suffix)
                .map_err(|e| ErpxError::Config(format!("Invalid base URL '{}': {}", config.url, e)))
        };
        let common = Endpoint::new(http.clone(), join(COMMON_SUFFIX)?);
        let object = Endpoint::new(http, join(OBJECT_SUFFIX)?);

        Ok(Self {
            config,
            common,
            object,
            sessions: SessionCache::new(),
            uid: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current session id, if a session is active.
    pub async fn session_id(&self) -> Option<i64> {
        *self.uid.read().await
    }

    /// Authenticate with the configured credentials.
    pub async fn authenticate(&self) -> Result<i64> {
        self.authenticate_with(&AuthOverrides::default()).await
    }

    /// Authenticate, with explicit arguments overriding the configured
    /// defaults field-by-field.
    ///
    /// An API key (explicit or configured) takes precedence over
    /// username/password. On a cache hit for the resolved credential tuple
    /// the cached session id is returned without a network call; on a miss
    /// exactly one authentication call is issued.
    pub async fn authenticate_with(&self, overrides: &AuthOverrides) -> Result<i64> {
        let db = overrides
            .db
            .clone()
            .or_else(|| self.config.db.clone())
            .ok_or_else(|| ErpxError::Config("No database configured for authentication".to_string()))?;

        let (key, login, secret) = match overrides
            .api_key
            .as_ref()
            .or(self.config.api_key.as_ref())
        {
            Some(api_key) => (
                CredentialKey::ApiKey {
                    db: db.clone(),
                    key: api_key.clone(),
                },
                API_KEY_LOGIN.to_string(),
                api_key.clone(),
            ),
            None => {
                let username = overrides
                    .username
                    .clone()
                    .or_else(|| self.config.username.clone())
                    .ok_or_else(|| {
                        ErpxError::Config("No API key or username configured".to_string())
                    })?;
                let password = overrides
                    .password
                    .clone()
                    .or_else(|| self.config.password.clone())
                    .ok_or_else(|| {
                        ErpxError::Config(format!("No password configured for user '{username}'"))
                    })?;
                (
                    CredentialKey::Password {
                        db: db.clone(),
                        username: username.clone(),
                        password: password.clone(),
                    },
                    username,
                    password,
                )
            }
        };

        if let Some(uid) = self.sessions.get(&key).await {
            debug!(db = %db, uid, "using cached session");
            *self.uid.write().await = Some(uid);
            return Ok(uid);
        }

        let params = [json!(db), json!(login), json!(secret), json!({})];
        let result = self.call(&self.common, "authenticate", &params).await?;

        let uid = parse_session_id(&result).ok_or_else(|| {
            ErpxError::AuthenticationFailed(format!(
                "server rejected credentials for database '{db}'"
            ))
        })?;

        debug!(db = %db, uid, "authenticated");
        self.sessions.insert(key, uid).await;
        *self.uid.write().await = Some(uid);
        Ok(uid)
    }

    /// Execute `method` on `entity` through the generic `execute_kw` dispatch.
    ///
    /// The guarded call path: without an active session, exactly one
    /// transparent authentication attempt is made before the call proceeds.
    pub async fn execute(
        &self,
        entity: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let uid = match self.session_id().await {
            Some(uid) => uid,
            None => self.authenticate().await?,
        };

        let db = self
            .config
            .db
            .clone()
            .ok_or_else(|| ErpxError::Config("No database configured".to_string()))?;
        let secret = self
            .config
            .password
            .clone()
            .or_else(|| self.config.api_key.clone())
            .ok_or_else(|| ErpxError::Config("No password or API key configured".to_string()))?;

        let params = [
            json!(db),
            json!(uid),
            json!(secret),
            json!(entity),
            json!(method),
            Value::Array(args),
            Value::Object(kwargs),
        ];
        self.call(&self.object, "execute_kw", &params).await
    }

    /// Search for record ids matching `domain`.
    pub async fn search(&self, entity: &str, domain: Value, options: &SearchOptions) -> Result<Value> {
        self.execute(entity, "search", vec![domain], options.to_kwargs())
            .await
    }

    /// Read the given records; all fields unless `fields` narrows them.
    pub async fn read(&self, entity: &str, ids: &[i64], fields: Option<&[&str]>) -> Result<Value> {
        let mut kwargs = Map::new();
        if let Some(fields) = fields {
            kwargs.insert("fields".to_string(), json!(fields));
        }
        self.execute(entity, "read", vec![json!(ids)], kwargs).await
    }

    /// Search and read in a single round trip.
    pub async fn search_read(
        &self,
        entity: &str,
        domain: Value,
        fields: Option<&[&str]>,
        options: &SearchOptions,
    ) -> Result<Value> {
        let mut kwargs = options.to_kwargs();
        if let Some(fields) = fields {
            kwargs.insert("fields".to_string(), json!(fields));
        }
        self.execute(entity, "search_read", vec![domain], kwargs)
            .await
    }

    /// Create one record; returns the server's result (the new id).
    pub async fn create(&self, entity: &str, values: Value) -> Result<Value> {
        self.execute(entity, "create", vec![values], Map::new())
            .await
    }

    /// Update the given records with `values`.
    pub async fn write(&self, entity: &str, ids: &[i64], values: Value) -> Result<Value> {
        self.execute(entity, "write", vec![json!(ids), values], Map::new())
            .await
    }

    /// Delete the given records.
    pub async fn unlink(&self, entity: &str, ids: &[i64]) -> Result<Value> {
        self.execute(entity, "unlink", vec![json!(ids)], Map::new())
            .await
    }

    /// Create records in contiguous chunks of at most `batch_size`, one
    /// create call per chunk, and return the new ids in input order.
    ///
    /// Not atomic: a failure on chunk `k` leaves chunks `1..k-1` committed on
    /// the server with no rollback.
    pub async fn create_batch(
        &self,
        entity: &str,
        values_list: &[Value],
        batch_size: usize,
    ) -> Result<Vec<i64>> {
        if batch_size == 0 {
            return Err(ErpxError::Config("batch_size must be at least 1".to_string()));
        }

        let mut ids = Vec::with_capacity(values_list.len());
        for chunk in values_list.chunks(batch_size) {
            let result = self
                .execute(entity, "create", vec![Value::Array(chunk.to_vec())], Map::new())
                .await?;
            match &result {
                Value::Array(items) => {
                    for item in items {
                        ids.push(item.as_i64().ok_or_else(|| self.batch_shape_error(item))?);
                    }
                }
                // A single-record chunk may come back as a bare id.
                other => match other.as_i64() {
                    Some(id) => ids.push(id),
                    None => return Err(self.batch_shape_error(other)),
                },
            }
        }
        Ok(ids)
    }

    fn batch_shape_error(&self, value: &Value) -> ErpxError {
        ErpxError::Protocol {
            status: 200,
            url: self.object.url().to_string(),
            message: format!("create returned a non-identifier value: {value}"),
        }
    }

    /// Dispatch with bounded retry for transport/protocol failures.
    ///
    /// `max_retries == 0` keeps single-attempt, fail-fast semantics. The
    /// delay doubles on each attempt; remote faults and auth failures are
    /// returned immediately.
    async fn call(&self, endpoint: &Endpoint, method: &str, params: &[Value]) -> Result<Value> {
        let mut attempt = 0u32;
        loop {
            match endpoint.call(method, params).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.config.max_retries && e.is_retryable() => {
                    let delay = self
                        .config
                        .retry_delay
                        .saturating_mul(2u32.saturating_pow(attempt));
                    warn!(method, attempt, error = %e, delay_ms = delay.as_millis() as u64, "call failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A session id is any non-zero integer; `false`, nil and zero all mean the
/// server rejected the credentials.
fn parse_session_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().filter(|uid| *uid != 0),
        _ => None,
    }
}

/// Per-call credential overrides for [`Client::authenticate_with`].
///
/// Unset fields fall back to the client configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthOverrides {
    pub db: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl AuthOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_db(mut self, db: &str) -> Self {
        self.db = Some(db.to_string());
        self
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

/// Pagination and ordering for [`Client::search`] and
/// [`Client::search_read`].
///
/// The wire shape always carries all three keys; an absent limit or order is
/// sent as nil, which the server reads as "no limit" / "default order".
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub offset: u64,
    pub limit: Option<u64>,
    pub order: Option<String>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order(mut self, order: &str) -> Self {
        self.order = Some(order.to_string());
        self
    }

    fn to_kwargs(&self) -> Map<String, Value> {
        let mut kwargs = Map::new();
        kwargs.insert("offset".to_string(), json!(self.offset));
        kwargs.insert(
            "limit".to_string(),
            self.limit.map_or(Value::Null, |limit| json!(limit)),
        );
        kwargs.insert(
            "order".to_string(),
            self.order.as_deref().map_or(Value::Null, |order| json!(order)),
        );
        kwargs
    }
}
