pub mod event;
pub mod order;
pub mod rider;
pub mod store;
pub mod tracking;
