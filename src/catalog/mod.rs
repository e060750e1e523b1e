pub mod models;
pub mod repository;

pub use models::TeacherModel;
pub use repository::CatalogRepository;

/// Teachers seeded into an empty catalog at startup
pub fn default_teachers() -> Vec<TeacherModel> {
    vec![
        TeacherModel::new(
            "Mr. Smith",
            &["Math", "Computer Science"],
            &[
                "Show your work.",
                "Knowledge is power.",
                "The more that you read, the more things you will know.",
            ],
        ),
        TeacherModel::new(
            "Ms. Johnson",
            &["English", "History"],
            &["Education is the passport to the future."],
        ),
        TeacherModel::new(
            "Dr. Lee",
            &["Science", "Music"],
            &[
                "The mind is not a vessel to be filled, but a fire to be kindled.",
                "The roots of education are bitter, but the fruit is sweet.",
            ],
        ),
        TeacherModel::new("Mrs. Garcia", &["Art", "PE"], &[]),
    ]
}
