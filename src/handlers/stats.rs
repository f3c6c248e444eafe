use actix_web::{get, web, HttpResponse};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use std::collections::HashMap;

use crate::{
    db::models::{paid_by_student, Student},
    db::MongoDbContext,
    error::Result,
};

#[derive(Debug, Serialize)]
pub struct ClassStat {
    pub class: String,
    pub class_total: f64,
    pub collected: f64,
    pub outstanding: f64,
    pub students_count: usize,
}

#[derive(Debug, Serialize)]
pub struct LatestStudent {
    pub id: String,
    pub name: String,
    pub class: String,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub class_stats: Vec<ClassStat>,
    pub total_collected: f64,
    pub total_outstanding: f64,
    pub latest_students: Vec<LatestStudent>,
}

/// Folds the full student list into per-class totals using pre-grouped paid
/// amounts. Classes come out in first-seen order of the name-sorted list.
fn class_stats(students: &[Student], collected: &HashMap<ObjectId, f64>) -> Vec<ClassStat> {
    let mut order: Vec<String> = Vec::new();
    let mut by_class: HashMap<String, ClassStat> = HashMap::new();

    for student in students {
        let paid = student
            .id
            .and_then(|id| collected.get(&id).copied())
            .unwrap_or(0.0);

        let entry = by_class
            .entry(student.class.clone())
            .or_insert_with(|| {
                order.push(student.class.clone());
                ClassStat {
                    class: student.class.clone(),
                    class_total: 0.0,
                    collected: 0.0,
                    outstanding: 0.0,
                    students_count: 0,
                }
            });

        entry.class_total += student.total_fee;
        entry.collected += paid;
        entry.students_count += 1;
    }

    order
        .into_iter()
        .filter_map(|class| {
            by_class.remove(&class).map(|mut stat| {
                stat.outstanding = stat.class_total - stat.collected;
                stat
            })
        })
        .collect()
}

async fn load_students_with_payments(
    db: &MongoDbContext,
) -> Result<(Vec<Student>, HashMap<ObjectId, f64>)> {
    let students = db.students().list(None).await?;
    let ids: Vec<ObjectId> = students.iter().filter_map(|s| s.id).collect();
    let fees = db.fees().find_by_student_ids(&ids).await?;
    let collected = paid_by_student(&fees);
    Ok((students, collected))
}

#[get("/stats/overview")]
pub async fn stats_overview(db: web::Data<MongoDbContext>) -> Result<HttpResponse> {
    let (students, collected) = load_students_with_payments(&db).await?;
    let stats = class_stats(&students, &collected);

    let total_collected: f64 = stats.iter().map(|s| s.collected).sum();
    let total_outstanding: f64 = stats.iter().map(|s| s.outstanding).sum();

    let latest_students = db
        .students()
        .latest(6)
        .await?
        .into_iter()
        .filter_map(|s| {
            s.id.map(|id| LatestStudent {
                id: id.to_hex(),
                name: s.name,
                class: s.class,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(OverviewResponse {
        class_stats: stats,
        total_collected,
        total_outstanding,
        latest_students,
    }))
}

#[derive(Debug, Serialize)]
pub struct ClassChartResponse {
    pub labels: Vec<String>,
    pub collected: Vec<f64>,
    pub outstanding: Vec<f64>,
}

#[get("/stats/classes")]
pub async fn stats_classes(db: web::Data<MongoDbContext>) -> Result<HttpResponse> {
    let (students, collected) = load_students_with_payments(&db).await?;
    let stats = class_stats(&students, &collected);

    let response = ClassChartResponse {
        labels: stats.iter().map(|s| s.class.clone()).collect(),
        collected: stats.iter().map(|s| s.collected).collect(),
        outstanding: stats.iter().map(|s| s.outstanding).collect(),
    };

    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, Serialize)]
pub struct UnpaidStudent {
    pub id: String,
    pub name: String,
    pub class: String,
    pub unpaid: f64,
}

#[derive(Debug, Serialize)]
pub struct UnpaidResponse {
    pub unpaid: Vec<UnpaidStudent>,
}

#[get("/stats/unpaid")]
pub async fn stats_unpaid(db: web::Data<MongoDbContext>) -> Result<HttpResponse> {
    let (students, collected) = load_students_with_payments(&db).await?;

    let unpaid = students
        .into_iter()
        .filter_map(|student| {
            let id = student.id?;
            let paid = collected.get(&id).copied().unwrap_or(0.0);
            let amount = student.unpaid(paid);
            if amount > 0.0 {
                Some(UnpaidStudent {
                    id: id.to_hex(),
                    name: student.name,
                    class: student.class,
                    unpaid: amount,
                })
            } else {
                None
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(UnpaidResponse { unpaid }))
}

#[derive(Debug, Serialize)]
pub struct ClassCount {
    pub class: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub total_students: u64,
    pub class_counts: Vec<ClassCount>,
    pub free_students: u64,
}

#[get("/stats/summary")]
pub async fn stats_summary(db: web::Data<MongoDbContext>) -> Result<HttpResponse> {
    let total_students = db.students().count().await?;
    let class_counts = db
        .students()
        .count_by_class()
        .await?
        .into_iter()
        .map(|(class, count)| ClassCount { class, count })
        .collect();
    let free_students = db.students().count_free().await?;

    Ok(HttpResponse::Ok().json(SummaryResponse {
        total_students,
        class_counts,
        free_students,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{FeeEntry, FeeStatus};

    fn student(name: &str, class: &str, total_fee: f64) -> Student {
        let mut s = Student::new(
            name.to_string(),
            class.to_string(),
            String::new(),
            total_fee,
        );
        s.id = Some(ObjectId::new());
        s
    }

    #[test]
    fn test_class_stats_totals() {
        let alice = student("Alice", "Grade 5", 5000.0);
        let bilal = student("Bilal", "Grade 5", 4000.0);
        let chen = student("Chen", "Grade 6", 3000.0);

        let fees = vec![
            FeeEntry::new(alice.id.unwrap(), 2000.0, None, FeeStatus::Paid, None),
            FeeEntry::new(bilal.id.unwrap(), 1000.0, None, FeeStatus::Paid, None),
            FeeEntry::new(chen.id.unwrap(), 500.0, None, FeeStatus::Pending, None),
        ];
        let collected = paid_by_student(&fees);

        let stats = class_stats(&[alice, bilal, chen], &collected);
        assert_eq!(stats.len(), 2);

        let grade5 = &stats[0];
        assert_eq!(grade5.class, "Grade 5");
        assert_eq!(grade5.class_total, 9000.0);
        assert_eq!(grade5.collected, 3000.0);
        assert_eq!(grade5.outstanding, 6000.0);
        assert_eq!(grade5.students_count, 2);

        // Pending entries do not count as collected
        let grade6 = &stats[1];
        assert_eq!(grade6.collected, 0.0);
        assert_eq!(grade6.outstanding, 3000.0);
    }

    #[test]
    fn test_class_stats_empty() {
        let stats = class_stats(&[], &HashMap::new());
        assert!(stats.is_empty());
    }
}
