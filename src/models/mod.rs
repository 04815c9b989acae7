// src/models/mod.rs

pub mod class;
pub mod course;
pub mod enrollment;
pub mod exam;
pub mod exam_result;
pub mod question;
pub mod student;
pub mod teacher;
