// src/models/class.rs

use crate::models::master::master_record;

master_record! {
    /// Represents the 'classes' table in the database.
    Class, table = "classes", label = "class"
}
