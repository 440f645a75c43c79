use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::clients::db::{checkout, DbPool};
use crate::errors::AppResult;

diesel::table! {
    request_logs (id) {
        id -> Int8,
        #[max_length = 64]
        ip_address -> Varchar,
        request_timestamp -> Timestamptz,
        #[max_length = 255]
        username -> Varchar,
        request_body -> Text,
    }
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = request_logs)]
pub struct RequestLog {
    pub id: i64,
    pub ip_address: String,
    pub request_timestamp: DateTime<Utc>,
    pub username: String,
    pub request_body: String,
}

#[derive(Debug, Insertable, Clone, PartialEq)]
#[diesel(table_name = request_logs)]
pub struct NewRequestLog {
    pub ip_address: String,
    pub request_timestamp: DateTime<Utc>,
    pub username: String,
    pub request_body: String,
}

/// Append-only destination for per-request audit rows.
pub trait RequestLogSink: Send + Sync {
    fn record(&self, entry: NewRequestLog) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgRequestLogs {
    pool: DbPool,
}

impl PgRequestLogs {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Logs with `start <= request_timestamp <= end`, oldest first.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Vec<RequestLog>> {
        let mut conn = checkout(&self.pool)?;
        let logs = request_logs::table
            .filter(request_logs::request_timestamp.ge(start))
            .filter(request_logs::request_timestamp.le(end))
            .order((request_logs::request_timestamp.asc(), request_logs::id.asc()))
            .load::<RequestLog>(&mut conn)?;
        Ok(logs)
    }
}

impl RequestLogSink for PgRequestLogs {
    fn record(&self, entry: NewRequestLog) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::insert_into(request_logs::table)
            .values(&entry)
            .execute(&mut conn)?;
        Ok(())
    }
}
