pub mod date;
pub mod logging;
pub mod response;
