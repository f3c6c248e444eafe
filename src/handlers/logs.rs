use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::{db::MongoDbContext, error::Result};

const LOG_PAGE_SIZE: i64 = 200;

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub action: String,
    pub details: String,
    pub by: String,
    pub at: String,
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub logs: Vec<LogEntry>,
}

#[get("/logs")]
pub async fn list_logs(db: web::Data<MongoDbContext>) -> Result<HttpResponse> {
    let entries = db.logs().recent(LOG_PAGE_SIZE).await?;

    let logs = entries
        .into_iter()
        .map(|entry| LogEntry {
            action: entry.action,
            details: entry.details.to_string(),
            by: entry.by,
            at: entry.at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(LogListResponse { logs }))
}
