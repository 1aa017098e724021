#![forbid(unsafe_code)]

pub mod balance;
pub mod model;
pub mod random;
pub mod time;

pub use random::RandomSource;
pub use time::Clock;
