use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Normalizes a student name: trims ends, collapses internal whitespace and
/// Title Cases each word. `"  moHaMmAd   fairoz  "` becomes `"Mohammad Fairoz"`.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl Admin {
    pub fn new(username: String, password: &str) -> Result<Self> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        Ok(Self::with_hash(username, password_hash))
    }

    /// For deployments that provide a pre-computed hash instead of a password.
    pub fn with_hash(username: String, password_hash: String) -> Self {
        Self {
            id: None,
            username,
            password_hash,
            created_at: Utc::now(),
            last_login: Utc::now(),
        }
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, &self.password_hash)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub class: String,
    pub contact: String,
    pub total_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: String, class: String, contact: String, total_fee: f64) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name,
            class,
            contact,
            total_fee,
            created_at: now,
            updated_at: now,
        }
    }

    /// Outstanding balance given the amount already collected.
    pub fn unpaid(&self, collected: f64) -> f64 {
        self.total_fee - collected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Paid,
    Pending,
}

impl Default for FeeStatus {
    fn default() -> Self {
        FeeStatus::Paid
    }
}

impl FeeStatus {
    /// Wire representation used in query and update documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Paid => "paid",
            FeeStatus::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub student_id: ObjectId,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub status: FeeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeeEntry {
    pub fn new(
        student_id: ObjectId,
        amount: f64,
        date: Option<DateTime<Utc>>,
        status: FeeStatus,
        note: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            student_id,
            amount,
            date: date.unwrap_or(now),
            status,
            note,
            created_at: now,
        }
    }
}

/// Sum of amounts for entries that have actually been paid.
pub fn paid_total(fees: &[FeeEntry]) -> f64 {
    fees.iter()
        .filter(|f| f.status == FeeStatus::Paid)
        .map(|f| f.amount)
        .sum()
}

/// Paid amounts grouped by student, for listings that show balances.
pub fn paid_by_student(fees: &[FeeEntry]) -> std::collections::HashMap<ObjectId, f64> {
    let mut totals = std::collections::HashMap::new();
    for fee in fees.iter().filter(|f| f.status == FeeStatus::Paid) {
        *totals.entry(fee.student_id).or_insert(0.0) += fee.amount;
    }
    totals
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub action: String,
    pub details: mongodb::bson::Document,
    pub by: String,
    pub at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(action: &str, details: mongodb::bson::Document, by: String) -> Self {
        Self {
            id: None,
            action: action.to_string(),
            details,
            by,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_collapses_and_titlecases() {
        assert_eq!(normalize_name("  moHaMmAd   fairoz  "), "Mohammad Fairoz");
        assert_eq!(normalize_name("alice"), "Alice");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_admin_new_hashes_password() {
        let admin = Admin::new("admin".to_string(), "password123").unwrap();
        assert_eq!(admin.username, "admin");
        assert_ne!(admin.password_hash, "password123");
        assert!(admin.id.is_none());
    }

    #[test]
    fn test_verify_password_correct() {
        let admin = Admin::new("admin".to_string(), "password123").unwrap();
        assert!(admin.verify_password("password123").unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let admin = Admin::new("admin".to_string(), "password123").unwrap();
        assert!(!admin.verify_password("wrongpassword").unwrap());
    }

    #[test]
    fn test_admin_with_prehashed_password() {
        let hash = bcrypt::hash("secret", bcrypt::DEFAULT_COST).unwrap();
        let admin = Admin::with_hash("admin".to_string(), hash);
        assert!(admin.verify_password("secret").unwrap());
    }

    #[test]
    fn test_student_unpaid() {
        let student = Student::new(
            "Alice Khan".to_string(),
            "Grade 5".to_string(),
            "0300-1234567".to_string(),
            5000.0,
        );
        assert_eq!(student.unpaid(0.0), 5000.0);
        assert_eq!(student.unpaid(1500.0), 3500.0);
    }

    #[test]
    fn test_paid_total_ignores_pending() {
        let student_id = ObjectId::new();
        let fees = vec![
            FeeEntry::new(student_id, 1000.0, None, FeeStatus::Paid, None),
            FeeEntry::new(student_id, 500.0, None, FeeStatus::Pending, None),
            FeeEntry::new(student_id, 250.0, None, FeeStatus::Paid, None),
        ];
        assert_eq!(paid_total(&fees), 1250.0);
    }

    #[test]
    fn test_paid_by_student_groups_amounts() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let fees = vec![
            FeeEntry::new(a, 1000.0, None, FeeStatus::Paid, None),
            FeeEntry::new(a, 500.0, None, FeeStatus::Paid, None),
            FeeEntry::new(b, 200.0, None, FeeStatus::Pending, None),
        ];

        let totals = paid_by_student(&fees);
        assert_eq!(totals.get(&a), Some(&1500.0));
        assert_eq!(totals.get(&b), None);
    }

    #[test]
    fn test_fee_status_serde_lowercase() {
        assert_eq!(serde_json::to_string(&FeeStatus::Paid).unwrap(), "\"paid\"");
        let status: FeeStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, FeeStatus::Pending);
    }
}
