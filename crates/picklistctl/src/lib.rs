pub mod cmd_check;
pub mod cmd_sort;
pub mod common;
