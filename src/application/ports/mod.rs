pub mod action_store;
pub mod channel_transport;
pub mod connectivity;
pub mod journal_store;
pub mod local_mirror;
pub mod remote_gateway;
pub mod session_store;
