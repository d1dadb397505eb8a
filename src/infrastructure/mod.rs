pub mod connectivity;
pub mod database;
pub mod folio;
pub mod offline;
pub mod realtime;
pub mod remote;
pub mod session;
