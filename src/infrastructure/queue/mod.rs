pub mod redis_mail_queue;

pub use redis_mail_queue::RedisMailQueue;
