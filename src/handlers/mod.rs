pub mod auth;
pub mod fees;
pub mod health;
pub mod logs;
pub mod stats;
pub mod students;

pub use auth::{login, logout};
pub use fees::{create_fee, delete_fee, get_fee, list_fees, update_fee};
pub use health::health_check;
pub use logs::list_logs;
pub use stats::{stats_classes, stats_overview, stats_summary, stats_unpaid};
pub use students::{create_student, delete_student, get_student, list_students, update_student};
