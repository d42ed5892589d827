pub mod config;
pub mod engine;
pub mod histogram;
pub mod moments;
pub mod search;


pub use config::{QueryConfig, TargetVariable};
pub use engine::{execute, run_query, QueryReport};
pub use histogram::Histogram;
pub use moments::Moments;
pub use search::{find_first, lower_bound, upper_bound};
