// src/models/lesson.rs

use crate::models::master::master_record;

master_record! {
    /// Represents the 'lessons' table in the database.
    Lesson, table = "lessons", label = "lesson"
}
