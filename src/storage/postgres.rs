//! PostgreSQL-backed performance store

use async_trait::async_trait;
use deadpool_postgres::{Config as PgConfig, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

use super::{PerformanceRecord, PerformanceStore, StorageError};
use crate::config::DatabaseConfig;
use crate::intent::Department;

const SELECT_PERFORMANCE: &str = "
    SELECT department_name::TEXT,
           year::INT4,
           month::INT4,
           COALESCE(sales_amount, 0)::INT8,
           COALESCE(contract_count, 0)::INT8,
           COALESCE(project_count, 0)::INT8,
           COALESCE(target_achievement_rate, 0)::FLOAT8
    FROM department_performance
    WHERE department_name = ANY($1) AND year = $2::INT4 AND month IS NOT NULL
    ORDER BY department_name, month";

/// Performance store over a deadpool-postgres pool
///
/// The pool connects lazily, so construction succeeds even while the
/// database is down; failures surface on the first query.
pub struct PgPerformanceStore {
    pool: Pool,
    timeout: Duration,
}

impl PgPerformanceStore {
    pub fn new(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let mut pg_config = PgConfig::new();
        pg_config.url = Some(config.url.clone());
        pg_config.connect_timeout = Some(config.timeout());
        pg_config.pool = Some(PoolConfig::new(config.pool_size));
        pg_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = pg_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::PoolInit(e.to_string()))?;

        Ok(Self {
            pool,
            timeout: config.timeout(),
        })
    }

    async fn query(&self, departments: &[Department], year: i32) -> Result<Vec<Row>, StorageError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;

        let names: Vec<String> = departments.iter().map(|d| d.name().to_string()).collect();
        Ok(client.query(SELECT_PERFORMANCE, &[&names, &year]).await?)
    }
}

/// Decode one row; rows for unknown departments or impossible months are skipped
fn record_from_row(row: &Row) -> Result<Option<PerformanceRecord>, StorageError> {
    let name: String = row.try_get(0)?;
    let Some(department) = Department::from_name(&name) else {
        tracing::debug!(department = %name, "Skipping row for unknown department");
        return Ok(None);
    };

    let month: i32 = row.try_get(2)?;
    let Ok(month) = u32::try_from(month) else {
        return Ok(None);
    };

    Ok(Some(PerformanceRecord {
        department,
        year: row.try_get(1)?,
        month,
        sales_amount: row.try_get(3)?,
        contract_count: row.try_get(4)?,
        project_count: row.try_get(5)?,
        target_achievement_rate: row.try_get(6)?,
    }))
}

#[async_trait]
impl PerformanceStore for PgPerformanceStore {
    async fn fetch(
        &self,
        departments: &[Department],
        year: i32,
    ) -> Result<Vec<PerformanceRecord>, StorageError> {
        if departments.is_empty() {
            return Ok(Vec::new());
        }

        let rows = tokio::time::timeout(self.timeout, self.query(departments, year))
            .await
            .map_err(|_| StorageError::Timeout)??;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(record) = record_from_row(row)? {
                records.push(record);
            }
        }
        tracing::debug!(year, count = records.len(), "Performance rows loaded");
        Ok(records)
    }
}
