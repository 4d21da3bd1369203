pub mod http;

pub use http::HttpMetricSource;
