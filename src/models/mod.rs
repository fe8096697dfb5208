pub mod did;
pub mod records;
