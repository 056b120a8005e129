pub mod receipts;
pub mod records;
