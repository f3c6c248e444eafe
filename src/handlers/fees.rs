use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{AuditLog, FeeEntry, FeeStatus},
    db::MongoDbContext,
    error::{Result, TuitionServerError},
    session::SessionManager,
};

use super::students::DeleteResponse;

#[derive(Debug, Deserialize)]
pub struct FeePayload {
    pub student_id: String,
    pub amount: f64,
    pub date: Option<DateTime<Utc>>,
    pub status: Option<FeeStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeeUpdatePayload {
    pub amount: f64,
    pub date: Option<DateTime<Utc>>,
    pub status: Option<FeeStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeeInfo {
    pub id: String,
    pub student_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub status: FeeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeeInfo {
    pub fn from_fee(fee: &FeeEntry) -> Result<Self> {
        let id = fee
            .id
            .ok_or_else(|| TuitionServerError::Internal("Fee record has no id".to_string()))?;

        Ok(Self {
            id: id.to_hex(),
            student_id: fee.student_id.to_hex(),
            amount: fee.amount,
            date: fee.date,
            status: fee.status,
            note: fee.note.clone(),
            created_at: fee.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FeeListResponse {
    pub fees: Vec<FeeInfo>,
}

#[derive(Debug, Deserialize)]
pub struct FeeListQuery {
    pub student_id: Option<String>,
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(TuitionServerError::Validation(
            "amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

#[get("/fees")]
pub async fn list_fees(
    query: web::Query<FeeListQuery>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let student_id = match query.student_id.as_deref() {
        Some(raw) => Some(ObjectId::parse_str(raw)?),
        None => None,
    };

    let fees = db.fees().list(student_id.as_ref()).await?;
    let infos = fees
        .iter()
        .map(FeeInfo::from_fee)
        .collect::<Result<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(FeeListResponse { fees: infos }))
}

#[get("/fees/{id}")]
pub async fn get_fee(path: web::Path<String>, db: web::Data<MongoDbContext>) -> Result<HttpResponse> {
    let id = ObjectId::parse_str(path.as_str())?;

    let fee = db
        .fees()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| TuitionServerError::NotFound("Fee entry".to_string()))?;

    Ok(HttpResponse::Ok().json(FeeInfo::from_fee(&fee)?))
}

#[post("/fees")]
pub async fn create_fee(
    payload: web::Json<FeePayload>,
    db: web::Data<MongoDbContext>,
    session_manager: web::Data<SessionManager>,
    session_id: web::ReqData<String>,
) -> Result<HttpResponse> {
    let session = session_manager.validate_session(&session_id)?;
    let student_id = ObjectId::parse_str(&payload.student_id)?;
    validate_amount(payload.amount)?;

    // The store is schemaless; the referential check lives here.
    if db.students().find_by_id(&student_id).await?.is_none() {
        return Err(TuitionServerError::Validation(
            "referenced student does not exist".to_string(),
        ));
    }

    let mut fee = FeeEntry::new(
        student_id,
        payload.amount,
        payload.date,
        payload.status.unwrap_or_default(),
        payload.note.clone(),
    );
    let id = db.fees().insert(&fee).await?;
    fee.id = Some(id);

    db.logs()
        .insert(&AuditLog::new(
            "add_payment",
            doc! {
                "fee_id": id.to_hex(),
                "student_id": student_id.to_hex(),
                "amount": payload.amount,
            },
            session.username,
        ))
        .await?;

    log::info!(
        "Recorded fee entry {} for student {} (amount {})",
        id.to_hex(),
        student_id.to_hex(),
        payload.amount
    );

    Ok(HttpResponse::Created().json(FeeInfo::from_fee(&fee)?))
}

#[put("/fees/{id}")]
pub async fn update_fee(
    path: web::Path<String>,
    payload: web::Json<FeeUpdatePayload>,
    db: web::Data<MongoDbContext>,
    session_manager: web::Data<SessionManager>,
    session_id: web::ReqData<String>,
) -> Result<HttpResponse> {
    let session = session_manager.validate_session(&session_id)?;
    let id = ObjectId::parse_str(path.as_str())?;
    validate_amount(payload.amount)?;

    let existing = db
        .fees()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| TuitionServerError::NotFound("Fee entry".to_string()))?;

    let date = payload.date.unwrap_or(existing.date);
    let status = payload.status.unwrap_or(existing.status);

    db.fees()
        .update_fields(&id, payload.amount, &date, status, payload.note.as_deref())
        .await?;

    db.logs()
        .insert(&AuditLog::new(
            "edit_payment",
            doc! { "fee_id": id.to_hex(), "amount": payload.amount },
            session.username,
        ))
        .await?;

    let fee = db
        .fees()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| TuitionServerError::NotFound("Fee entry".to_string()))?;

    Ok(HttpResponse::Ok().json(FeeInfo::from_fee(&fee)?))
}

#[delete("/fees/{id}")]
pub async fn delete_fee(
    path: web::Path<String>,
    db: web::Data<MongoDbContext>,
    session_manager: web::Data<SessionManager>,
    session_id: web::ReqData<String>,
) -> Result<HttpResponse> {
    let session = session_manager.validate_session(&session_id)?;
    let id = ObjectId::parse_str(path.as_str())?;

    let deleted = db.fees().delete(&id).await?;
    if !deleted {
        return Err(TuitionServerError::NotFound("Fee entry".to_string()));
    }

    db.logs()
        .insert(&AuditLog::new(
            "delete_payment",
            doc! { "fee_id": id.to_hex() },
            session.username,
        ))
        .await?;

    Ok(HttpResponse::Ok().json(DeleteResponse {
        success: true,
        message: "Fee entry deleted".to_string(),
    }))
}
