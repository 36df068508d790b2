pub mod panic;
pub mod testing;
