pub mod buffer_pool;
pub mod ports;
pub mod services;
