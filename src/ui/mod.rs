pub mod json;
pub mod report;
