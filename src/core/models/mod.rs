pub mod key;
pub mod key_details;
pub mod operation_result;
