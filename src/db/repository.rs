use chrono::{DateTime, Utc};
use futures_util::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    Client, Collection, Database,
};

use super::models::{Admin, AuditLog, FeeEntry, FeeStatus, Student};
use crate::error::{Result, TuitionServerError};

/// Serialize a timestamp the same way the typed collections do, so update
/// documents stay comparable with inserted fields.
fn bson_datetime(dt: &DateTime<Utc>) -> Result<Bson> {
    mongodb::bson::to_bson(dt)
        .map_err(|e| TuitionServerError::Internal(format!("Failed to encode timestamp: {}", e)))
}

#[derive(Clone)]
pub struct MongoDbContext {
    db: Database,
}

impl MongoDbContext {
    pub fn new(client: Client, database_name: &str) -> Self {
        Self {
            db: client.database(database_name),
        }
    }

    pub fn admins(&self) -> AdminRepository {
        AdminRepository {
            collection: self.db.collection("admins"),
        }
    }

    pub fn students(&self) -> StudentRepository {
        StudentRepository {
            collection: self.db.collection("students"),
        }
    }

    pub fn fees(&self) -> FeeRepository {
        FeeRepository {
            collection: self.db.collection("fees"),
        }
    }

    pub fn logs(&self) -> LogRepository {
        LogRepository {
            collection: self.db.collection("logs"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        // Single admin account, unique by username
        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.db
            .collection::<Admin>("admins")
            .create_index(username_index)
            .await?;

        // Duplicate checks and class-filtered listings both hit (name, class)
        let student_name_index = IndexModel::builder()
            .keys(doc! { "name": 1, "class": 1 })
            .build();

        self.db
            .collection::<Student>("students")
            .create_index(student_name_index)
            .await?;

        let fee_student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .build();

        self.db
            .collection::<FeeEntry>("fees")
            .create_index(fee_student_index)
            .await?;

        let log_time_index = IndexModel::builder().keys(doc! { "at": -1 }).build();

        self.db
            .collection::<AuditLog>("logs")
            .create_index(log_time_index)
            .await?;

        log::info!("Database indexes created successfully");
        Ok(())
    }
}

#[derive(Clone)]
pub struct AdminRepository {
    collection: Collection<Admin>,
}

impl AdminRepository {
    pub async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    pub async fn insert(&self, admin: &Admin) -> Result<ObjectId> {
        let result = self.collection.insert_one(admin).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TuitionServerError::Internal("Admin insert returned no id".to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let admin = self
            .collection
            .find_one(doc! { "username": username })
            .await?;
        Ok(admin)
    }

    pub async fn update_last_login(&self, id: &ObjectId) -> Result<()> {
        let now = bson_datetime(&Utc::now())?;
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "last_login": now } })
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct StudentRepository {
    collection: Collection<Student>,
}

impl StudentRepository {
    pub async fn insert(&self, student: &Student) -> Result<ObjectId> {
        let result = self.collection.insert_one(student).await?;
        result.inserted_id.as_object_id().ok_or_else(|| {
            TuitionServerError::Internal("Student insert returned no id".to_string())
        })
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Student>> {
        let student = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(student)
    }

    /// Students sorted by name, optionally restricted to one class.
    pub async fn list(&self, class: Option<&str>) -> Result<Vec<Student>> {
        let filter = match class {
            Some(class) => doc! { "class": class },
            None => doc! {},
        };

        let mut cursor = self.collection.find(filter).sort(doc! { "name": 1 }).await?;

        let mut students = Vec::new();
        while let Some(student) = cursor.try_next().await? {
            students.push(student);
        }

        Ok(students)
    }

    pub async fn latest(&self, limit: i64) -> Result<Vec<Student>> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?;

        let mut students = Vec::new();
        while let Some(student) = cursor.try_next().await? {
            students.push(student);
        }

        Ok(students)
    }

    /// Exact match on normalized name within the same class, used for the
    /// duplicate check. `exclude` skips the record being edited.
    pub async fn find_duplicate(
        &self,
        name: &str,
        class: &str,
        exclude: Option<&ObjectId>,
    ) -> Result<Option<Student>> {
        let mut filter = doc! { "name": name, "class": class };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }

        let student = self.collection.find_one(filter).await?;
        Ok(student)
    }

    /// Returns false when no student matched the id.
    pub async fn update_fields(
        &self,
        id: &ObjectId,
        name: &str,
        class: &str,
        contact: &str,
        total_fee: f64,
    ) -> Result<bool> {
        let now = bson_datetime(&Utc::now())?;
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "name": name,
                    "class": class,
                    "contact": contact,
                    "total_fee": total_fee,
                    "updated_at": now,
                }},
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn distinct_classes(&self) -> Result<Vec<String>> {
        let values = self.collection.distinct("class", doc! {}).await?;
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    /// Students with no fee configured at all.
    pub async fn count_free(&self) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "total_fee": 0.0 })
            .await?)
    }

    /// Per-class student counts via an aggregation pipeline, sorted by class.
    pub async fn count_by_class(&self) -> Result<Vec<(String, u64)>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$class", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];

        let mut cursor = self.collection.aggregate(pipeline).await?;

        let mut counts = Vec::new();
        while let Some(entry) = cursor.try_next().await? {
            let class = entry.get_str("_id").unwrap_or_default().to_string();
            // $sum produces an i32 until the count overflows it
            let count = entry
                .get_i32("count")
                .map(|c| c as u64)
                .or_else(|_| entry.get_i64("count").map(|c| c as u64))
                .unwrap_or(0);
            counts.push((class, count));
        }

        Ok(counts)
    }
}

#[derive(Clone)]
pub struct FeeRepository {
    collection: Collection<FeeEntry>,
}

impl FeeRepository {
    pub async fn insert(&self, fee: &FeeEntry) -> Result<ObjectId> {
        let result = self.collection.insert_one(fee).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TuitionServerError::Internal("Fee insert returned no id".to_string()))
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<FeeEntry>> {
        let fee = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(fee)
    }

    /// Fee entries, newest first, optionally restricted to one student.
    pub async fn list(&self, student_id: Option<&ObjectId>) -> Result<Vec<FeeEntry>> {
        let filter = match student_id {
            Some(id) => doc! { "student_id": id },
            None => doc! {},
        };

        let mut cursor = self.collection.find(filter).sort(doc! { "date": -1 }).await?;

        let mut fees = Vec::new();
        while let Some(fee) = cursor.try_next().await? {
            fees.push(fee);
        }

        Ok(fees)
    }

    pub async fn find_by_student_ids(&self, student_ids: &[ObjectId]) -> Result<Vec<FeeEntry>> {
        let mut cursor = self
            .collection
            .find(doc! { "student_id": { "$in": student_ids } })
            .await?;

        let mut fees = Vec::new();
        while let Some(fee) = cursor.try_next().await? {
            fees.push(fee);
        }

        Ok(fees)
    }

    pub async fn update_fields(
        &self,
        id: &ObjectId,
        amount: f64,
        date: &DateTime<Utc>,
        status: FeeStatus,
        note: Option<&str>,
    ) -> Result<bool> {
        let mut set = doc! {
            "amount": amount,
            "date": bson_datetime(date)?,
            "status": status.as_str(),
        };
        let mut update = Document::new();
        match note {
            Some(note) => {
                set.insert("note", note);
            }
            None => {
                update.insert("$unset", doc! { "note": "" });
            }
        }
        update.insert("$set", set);

        let result = self.collection.update_one(doc! { "_id": id }, update).await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Clone)]
pub struct LogRepository {
    collection: Collection<AuditLog>,
}

impl LogRepository {
    pub async fn insert(&self, entry: &AuditLog) -> Result<()> {
        self.collection.insert_one(entry).await?;
        Ok(())
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditLog>> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "at": -1 })
            .limit(limit)
            .await?;

        let mut entries = Vec::new();
        while let Some(entry) = cursor.try_next().await? {
            entries.push(entry);
        }

        Ok(entries)
    }
}
