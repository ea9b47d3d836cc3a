use crate::config::AppConfig;
use crate::entities::sequence_counter::{self, Entity as SequenceCounter};
use crate::errors::ServiceError;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbBackend, EntityTrait, QueryFilter, Set, Statement,
};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Create the schema if it does not exist yet. Idempotent.
pub async fn run_migrations(db: &DbPool) -> Result<(), ServiceError> {
    let backend = db.get_database_backend();
    for sql in schema_statements(backend) {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }
    info!("Database schema is up to date");
    Ok(())
}

fn schema_statements(backend: DbBackend) -> Vec<&'static str> {
    match backend {
        DbBackend::Sqlite => vec![
            r#"CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL,
                unit_price REAL NOT NULL,
                created_at TEXT NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_code INTEGER NOT NULL UNIQUE,
                customer_ref TEXT,
                total REAL NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                version INTEGER NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS order_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES orders(id),
                product_id INTEGER NOT NULL,
                product_name TEXT NOT NULL,
                unit_price REAL NOT NULL,
                quantity INTEGER NOT NULL,
                line_total REAL NOT NULL,
                created_at TEXT NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY NOT NULL,
                order_id INTEGER NOT NULL REFERENCES orders(id),
                amount REAL NOT NULL,
                qr_code TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT
            );"#,
            r#"CREATE INDEX IF NOT EXISTS idx_payments_order_id ON payments(order_id);"#,
            r#"CREATE TABLE IF NOT EXISTS sequence_counters (
                name TEXT PRIMARY KEY NOT NULL,
                value INTEGER NOT NULL
            );"#,
        ],
        _ => vec![
            r#"CREATE TABLE IF NOT EXISTS products (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR NOT NULL,
                description VARCHAR,
                category VARCHAR(10) NOT NULL,
                unit_price NUMERIC(19, 4) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS orders (
                id BIGSERIAL PRIMARY KEY,
                order_code BIGINT NOT NULL UNIQUE,
                customer_ref VARCHAR,
                total NUMERIC(19, 4) NOT NULL,
                status VARCHAR(20) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ,
                version INTEGER NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS order_items (
                id BIGSERIAL PRIMARY KEY,
                order_id BIGINT NOT NULL REFERENCES orders(id),
                product_id BIGINT NOT NULL,
                product_name VARCHAR NOT NULL,
                unit_price NUMERIC(19, 4) NOT NULL,
                quantity INTEGER NOT NULL,
                line_total NUMERIC(19, 4) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS payments (
                id VARCHAR PRIMARY KEY,
                order_id BIGINT NOT NULL REFERENCES orders(id),
                amount NUMERIC(19, 4) NOT NULL,
                qr_code VARCHAR NOT NULL,
                status VARCHAR(10) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ
            );"#,
            r#"CREATE INDEX IF NOT EXISTS idx_payments_order_id ON payments(order_id);"#,
            r#"CREATE TABLE IF NOT EXISTS sequence_counters (
                name VARCHAR PRIMARY KEY,
                value BIGINT NOT NULL
            );"#,
        ],
    }
}

/// Name of the counter backing externally visible order numbers.
pub const ORDER_CODE_SEQUENCE: &str = "order_code";

/// Allocates the next value of a named sequence.
///
/// The increment is a single atomic UPDATE; run inside the same transaction
/// as the row that consumes the value, the counter's row lock serializes
/// concurrent allocations with their saves. A transaction that rolls back
/// after allocating leaves a gap, never a duplicate.
pub async fn next_sequence<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i64, ServiceError> {
    let updated = SequenceCounter::update_many()
        .col_expr(
            sequence_counter::Column::Value,
            Expr::col(sequence_counter::Column::Value).add(1),
        )
        .filter(sequence_counter::Column::Name.eq(name))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        // First allocation under this name
        let seed = sequence_counter::ActiveModel {
            name: Set(name.to_string()),
            value: Set(1),
        };
        seed.insert(conn).await?;
        return Ok(1);
    }

    let row = SequenceCounter::find_by_id(name.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InternalError(format!("sequence counter '{}' missing after update", name))
        })?;

    Ok(row.value)
}
