mod registry;

pub use registry::CorrelationRegistry;
