// src/models/mod.rs

pub mod answer_record;
pub mod assignment;
pub mod class;
pub mod exam;
pub mod lesson;
pub mod master;
pub mod question;
pub mod role;
pub mod tag;
pub mod user;
