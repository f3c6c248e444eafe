use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{normalize_name, paid_by_student, paid_total, AuditLog, Student},
    db::MongoDbContext,
    error::{Result, TuitionServerError},
    session::SessionManager,
};

use super::fees::FeeInfo;

#[derive(Debug, Deserialize)]
pub struct StudentPayload {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub total_fee: f64,
}

impl StudentPayload {
    /// Presence checks plus name normalization; returns the cleaned fields.
    fn validate(&self) -> Result<(String, String, String)> {
        let name = normalize_name(&self.name);
        if name.is_empty() {
            return Err(TuitionServerError::Validation("name is required".to_string()));
        }

        let class = self.class.trim().to_string();
        if class.is_empty() {
            return Err(TuitionServerError::Validation(
                "class is required".to_string(),
            ));
        }

        Ok((name, class, self.contact.trim().to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct StudentInfo {
    pub id: String,
    pub name: String,
    pub class: String,
    pub contact: String,
    pub total_fee: f64,
    pub unpaid: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentInfo {
    fn from_student(student: &Student, collected: f64) -> Result<Self> {
        let id = student
            .id
            .ok_or_else(|| TuitionServerError::Internal("Student record has no id".to_string()))?;

        Ok(Self {
            id: id.to_hex(),
            name: student.name.clone(),
            class: student.class.clone(),
            contact: student.contact.clone(),
            total_fee: student.total_fee,
            unpaid: student.unpaid(collected),
            created_at: student.created_at,
            updated_at: student.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StudentListResponse {
    pub students: Vec<StudentInfo>,
    pub classes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentListQuery {
    pub class: Option<String>,
}

#[get("/students")]
pub async fn list_students(
    query: web::Query<StudentListQuery>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let students = db.students().list(query.class.as_deref()).await?;

    let ids: Vec<ObjectId> = students.iter().filter_map(|s| s.id).collect();
    let fees = db.fees().find_by_student_ids(&ids).await?;
    let collected = paid_by_student(&fees);

    let mut infos = Vec::with_capacity(students.len());
    for student in &students {
        let paid = student
            .id
            .and_then(|id| collected.get(&id).copied())
            .unwrap_or(0.0);
        infos.push(StudentInfo::from_student(student, paid)?);
    }

    let classes = db.students().distinct_classes().await?;

    log::info!("Listed {} students", infos.len());

    Ok(HttpResponse::Ok().json(StudentListResponse {
        students: infos,
        classes,
    }))
}

#[derive(Debug, Serialize)]
pub struct StudentDetailResponse {
    pub student: StudentInfo,
    pub fees: Vec<FeeInfo>,
}

#[get("/students/{id}")]
pub async fn get_student(
    path: web::Path<String>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let id = ObjectId::parse_str(path.as_str())?;

    let student = db
        .students()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| TuitionServerError::NotFound("Student".to_string()))?;

    let fees = db.fees().list(Some(&id)).await?;
    let collected = paid_total(&fees);

    let fee_infos = fees
        .iter()
        .map(FeeInfo::from_fee)
        .collect::<Result<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(StudentDetailResponse {
        student: StudentInfo::from_student(&student, collected)?,
        fees: fee_infos,
    }))
}

#[post("/students")]
pub async fn create_student(
    payload: web::Json<StudentPayload>,
    db: web::Data<MongoDbContext>,
    session_manager: web::Data<SessionManager>,
    session_id: web::ReqData<String>,
) -> Result<HttpResponse> {
    let session = session_manager.validate_session(&session_id)?;
    let (name, class, contact) = payload.validate()?;

    if db
        .students()
        .find_duplicate(&name, &class, None)
        .await?
        .is_some()
    {
        return Err(TuitionServerError::Duplicate(format!(
            "A student named '{}' already exists in class '{}'",
            name, class
        )));
    }

    let mut student = Student::new(name.clone(), class, contact, payload.total_fee);
    let id = db.students().insert(&student).await?;
    student.id = Some(id);

    db.logs()
        .insert(&AuditLog::new(
            "add_student",
            doc! { "student_id": id.to_hex(), "name": &name },
            session.username,
        ))
        .await?;

    log::info!("Added student {} ({})", name, id.to_hex());

    Ok(HttpResponse::Created().json(StudentInfo::from_student(&student, 0.0)?))
}

#[put("/students/{id}")]
pub async fn update_student(
    path: web::Path<String>,
    payload: web::Json<StudentPayload>,
    db: web::Data<MongoDbContext>,
    session_manager: web::Data<SessionManager>,
    session_id: web::ReqData<String>,
) -> Result<HttpResponse> {
    let session = session_manager.validate_session(&session_id)?;
    let id = ObjectId::parse_str(path.as_str())?;
    let (name, class, contact) = payload.validate()?;

    // Ignore the record being edited when checking for duplicates
    if db
        .students()
        .find_duplicate(&name, &class, Some(&id))
        .await?
        .is_some()
    {
        return Err(TuitionServerError::Duplicate(format!(
            "Another student named '{}' already exists in class '{}'",
            name, class
        )));
    }

    let matched = db
        .students()
        .update_fields(&id, &name, &class, &contact, payload.total_fee)
        .await?;

    if !matched {
        return Err(TuitionServerError::NotFound("Student".to_string()));
    }

    db.logs()
        .insert(&AuditLog::new(
            "edit_student",
            doc! { "student_id": id.to_hex() },
            session.username,
        ))
        .await?;

    let student = db
        .students()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| TuitionServerError::NotFound("Student".to_string()))?;

    let fees = db.fees().list(Some(&id)).await?;

    Ok(HttpResponse::Ok().json(StudentInfo::from_student(&student, paid_total(&fees))?))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[delete("/students/{id}")]
pub async fn delete_student(
    path: web::Path<String>,
    db: web::Data<MongoDbContext>,
    session_manager: web::Data<SessionManager>,
    session_id: web::ReqData<String>,
) -> Result<HttpResponse> {
    let session = session_manager.validate_session(&session_id)?;
    let id = ObjectId::parse_str(path.as_str())?;

    // Fee entries referencing this student are kept; history stays queryable.
    let deleted = db.students().delete(&id).await?;
    if !deleted {
        return Err(TuitionServerError::NotFound("Student".to_string()));
    }

    db.logs()
        .insert(&AuditLog::new(
            "delete_student",
            doc! { "student_id": id.to_hex() },
            session.username,
        ))
        .await?;

    log::info!("Deleted student {}", id.to_hex());

    Ok(HttpResponse::Ok().json(DeleteResponse {
        success: true,
        message: "Student deleted".to_string(),
    }))
}
