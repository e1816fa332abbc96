mod kv;
mod pool;

pub use kv::RedisResolver;
pub use pool::{Pool, PoolError, PooledConnection};
