pub mod assignment;
pub mod cart;
pub mod lifecycle;
pub mod queue;
pub mod selection;
