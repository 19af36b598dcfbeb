//! Database persistence for calculation history.
//!
//! Stores each saved calculation with its inputs and headline results so
//! past trades can be listed and compared later.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::models::{TradeInput, TradeResult};

/// Database connection pool.
pub struct Database {
    pool: SqlitePool,
}

/// Stored calculation record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredCalculation {
    pub id: String,
    pub symbol: Option<String>,
    pub leverage: f64,
    pub buy_price: f64,
    pub exit_target: f64,
    pub sell_mode: String,
    pub holding_days: i64,
    pub size_value: f64,
    pub size_mode: String,
    pub shares: i64,
    pub total_exposure: f64,
    pub margin_required: f64,
    pub total_charges: f64,
    pub financing_interest: f64,
    pub net_profit: f64,
    pub return_on_margin_pct: f64,
    pub is_profitable: bool,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Create a new database connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Private in-memory database; a single connection keeps one shared store.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run all database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS calculations (
                id TEXT PRIMARY KEY,
                symbol TEXT,
                leverage REAL NOT NULL,
                buy_price REAL NOT NULL,
                exit_target REAL NOT NULL,
                sell_mode TEXT NOT NULL,
                holding_days INTEGER NOT NULL,
                size_value REAL NOT NULL,
                size_mode TEXT NOT NULL,
                shares INTEGER NOT NULL,
                total_exposure REAL NOT NULL,
                margin_required REAL NOT NULL,
                total_charges REAL NOT NULL,
                financing_interest REAL NOT NULL,
                net_profit REAL NOT NULL,
                return_on_margin_pct REAL NOT NULL,
                is_profitable INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_calculations_created ON calculations(created_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_calculations_symbol ON calculations(symbol)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== Calculations ====================

    /// Save a calculation and return its id.
    pub async fn save_calculation(
        &self,
        symbol: Option<&str>,
        input: &TradeInput,
        result: &TradeResult,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let shares = i64::try_from(result.shares).context("Share count too large to store")?;

        sqlx::query(
            r#"
            INSERT INTO calculations (
                id, symbol, leverage, buy_price, exit_target, sell_mode, holding_days,
                size_value, size_mode, shares, total_exposure, margin_required,
                total_charges, financing_interest, net_profit, return_on_margin_pct,
                is_profitable, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(symbol)
        .bind(to_real(input.leverage_multiplier, "leverage")?)
        .bind(to_real(input.buy_price, "buy_price")?)
        .bind(to_real(input.exit_target, "exit_target")?)
        .bind(input.sell_mode.as_str())
        .bind(i64::from(input.holding_days))
        .bind(to_real(input.size_value, "size_value")?)
        .bind(input.size_mode.as_str())
        .bind(shares)
        .bind(to_real(result.total_exposure, "total_exposure")?)
        .bind(to_real(result.margin_required, "margin_required")?)
        .bind(to_real(result.total_charges, "total_charges")?)
        .bind(to_real(result.financing_interest, "financing_interest")?)
        .bind(to_real(result.net_profit, "net_profit")?)
        .bind(to_real(result.return_on_margin_pct, "return_on_margin_pct")?)
        .bind(result.is_profitable)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to save calculation")?;

        Ok(id)
    }

    /// Most recent calculations first.
    pub async fn recent_calculations(&self, limit: i64) -> Result<Vec<StoredCalculation>> {
        sqlx::query_as::<_, StoredCalculation>(
            "SELECT * FROM calculations ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch calculations")
    }

    /// Calculations for one symbol, most recent first.
    pub async fn calculations_for_symbol(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<StoredCalculation>> {
        sqlx::query_as::<_, StoredCalculation>(
            "SELECT * FROM calculations WHERE symbol = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch calculations")
    }

    /// Delete all saved calculations, returning how many were removed.
    pub async fn clear_calculations(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM calculations")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Decimal as a SQLite REAL column value.
fn to_real(value: Decimal, column: &str) -> Result<f64> {
    value
        .to_f64()
        .with_context(|| format!("Cannot store {} = {} as REAL", column, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::MtfCalculator;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_save_and_list() {
        let db = Database::in_memory().await.unwrap();
        let calc = MtfCalculator::default();
        let input = TradeInput::exact_quantity(dec!(4), dec!(100), dec!(110), 5, dec!(100));
        let result = calc.calculate(&input).unwrap();

        let id = db.save_calculation(Some("RELIANCE"), &input, &result).await.unwrap();
        db.save_calculation(None, &input, &result).await.unwrap();

        let all = db.recent_calculations(10).await.unwrap();
        assert_eq!(all.len(), 2);

        let saved = db.calculations_for_symbol("RELIANCE", 10).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, id);
        assert_eq!(saved[0].shares, 100);
        assert_eq!(saved[0].sell_mode, "EXACT");
        assert!((saved[0].net_profit - 914.01).abs() < 1e-9);
        assert!(saved[0].is_profitable);

        assert_eq!(db.clear_calculations().await.unwrap(), 2);
        assert!(db.recent_calculations(10).await.unwrap().is_empty());
    }

    #[test]
    fn test_to_real() {
        assert!((to_real(dec!(914.01), "net_profit").unwrap() - 914.01).abs() < 1e-9);
        assert_eq!(to_real(dec!(-0.5), "net_profit").unwrap(), -0.5);
        assert_eq!(to_real(Decimal::ZERO, "net_profit").unwrap(), 0.0);
    }
}
