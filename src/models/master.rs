// src/models/master.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::store::Record;

/// Simple named master data (lessons, classes, tags) sharing one request shape.
pub trait Master: Record {
    /// Singular label used in log lines.
    const LABEL: &'static str;

    fn new(name: String, description: Option<String>, actor: Option<Uuid>) -> Self;

    fn set(&mut self, name: String, description: Option<String>);
}

/// DTO for creating or updating a lesson, class or tag.
#[derive(Debug, Deserialize, Validate)]
pub struct MasterRequest {
    #[validate(length(min = 1, max = 100, message = "Name length must be between 1 and 100 characters."))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Name and description of a referenced master record, embedded in parents.
#[derive(Debug, Clone, Serialize)]
pub struct MasterSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Declares a lesson-like table: the row struct plus its `Record` and
/// `Master` impls. All of them share the same columns.
macro_rules! master_record {
    ($(#[$meta:meta])* $name:ident, table = $table:literal, label = $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, ::sqlx::FromRow, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $name {
            pub id: ::uuid::Uuid,
            pub name: String,
            pub description: Option<String>,

            #[sqlx(flatten)]
            #[serde(flatten)]
            pub audit: $crate::store::Audit,
        }

        impl $name {
            pub fn summary(&self) -> $crate::models::master::MasterSummary {
                $crate::models::master::MasterSummary {
                    id: self.id,
                    name: self.name.clone(),
                    description: self.description.clone(),
                }
            }
        }

        impl $crate::store::Record for $name {
            const TABLE: &'static str = $table;
            const SEARCH: &'static [&'static str] = &["name", "description"];
            const SORTABLE: &'static [&'static str] = &["name"];

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn audit(&self) -> &$crate::store::Audit {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut $crate::store::Audit {
                &mut self.audit
            }

            fn columns(&self) -> Vec<(&'static str, $crate::store::Param)> {
                vec![
                    ("name", self.name.clone().into()),
                    ("description", self.description.clone().into()),
                ]
            }
        }

        impl $crate::models::master::Master for $name {
            const LABEL: &'static str = $label;

            fn new(name: String, description: Option<String>, actor: Option<::uuid::Uuid>) -> Self {
                Self {
                    id: ::uuid::Uuid::new_v4(),
                    name,
                    description,
                    audit: $crate::store::Audit::created(actor),
                }
            }

            fn set(&mut self, name: String, description: Option<String>) {
                self.name = name;
                self.description = description;
            }
        }
    };
}

pub(crate) use master_record;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{class::Class, lesson::Lesson, tag::Tag};

    #[test]
    fn each_master_keeps_its_own_table() {
        assert_eq!(<Lesson as Record>::TABLE, "lessons");
        assert_eq!(<Class as Record>::TABLE, "classes");
        assert_eq!(<Tag as Record>::TABLE, "tags");
        assert_eq!(Class::LABEL, "class");
    }

    #[test]
    fn set_replaces_name_and_description() {
        let actor = Some(Uuid::new_v4());
        let mut tag = Tag::new("algebra".to_string(), None, actor);
        tag.set("geometry".to_string(), Some("<p>shapes</p>".to_string()));

        let summary = tag.summary();
        assert_eq!(summary.id, tag.id);
        assert_eq!(summary.name, "geometry");
        assert_eq!(summary.description.as_deref(), Some("<p>shapes</p>"));
        assert_eq!(tag.audit.created_by, actor);
        assert!(!tag.audit.deleted);
    }
}
