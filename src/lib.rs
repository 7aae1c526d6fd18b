pub mod cancel_status;
pub mod process_iterator;
pub mod resolver;
pub mod sampler;

pub use sampler::Pid;
