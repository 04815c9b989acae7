// src/handlers/mod.rs

pub mod ai;
pub mod classes;
pub mod courses;
pub mod enrollments;
pub mod exam_results;
pub mod exams;
pub mod questions;
pub mod students;
pub mod teachers;
