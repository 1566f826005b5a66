pub mod category;
pub mod procedure;
pub mod user;
