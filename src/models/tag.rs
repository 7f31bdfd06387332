// src/models/tag.rs

use crate::models::master::master_record;

master_record! {
    /// Represents the 'tags' table in the database.
    Tag, table = "tags", label = "tag"
}
