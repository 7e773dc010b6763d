pub mod forms;
pub mod pages;
pub mod registry;
pub mod session;
