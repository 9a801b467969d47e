//! HTTP layer: request values, transport seam, session pipeline

pub mod pipeline;
pub mod request;
pub mod transport;

pub use pipeline::{REFRESH_PATH, SessionPipeline};
pub use request::{ApiRequest, RawResponse};
pub use transport::{HttpTransport, ReqwestTransport};
