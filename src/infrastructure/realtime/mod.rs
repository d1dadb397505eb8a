mod hub;

pub use hub::InMemoryChannelHub;
