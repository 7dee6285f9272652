pub mod address;
pub mod money;
pub mod order;
