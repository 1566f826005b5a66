pub mod api_client;
pub mod board;
pub mod board_session;
pub mod column_assignment;
pub mod procedures;
pub mod projection;
