// src/services/mod.rs

pub mod exam_session;
