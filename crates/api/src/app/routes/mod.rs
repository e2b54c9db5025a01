pub mod shop;
pub mod system;
