use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A teacher known to the catalog, with the subjects they teach and their
/// quote pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherModel {
    pub id: String,
    pub name: String,
    pub subjects: Vec<String>,
    pub quotes: Vec<String>,
}

impl TeacherModel {
    pub fn new(name: &str, subjects: &[&str], quotes: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            quotes: quotes.iter().map(|q| q.to_string()).collect(),
        }
    }
}
