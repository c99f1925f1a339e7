pub mod file_docs;
pub mod repos;
