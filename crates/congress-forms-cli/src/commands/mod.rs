pub mod cwc;
pub mod fill;
pub mod import;
pub mod list;
pub mod office;
pub mod required;
pub mod status;
pub mod utils;
