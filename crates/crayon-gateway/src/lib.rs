pub mod bootstrap;
pub mod pipeline;
pub mod router;

pub use bootstrap::{Services, build_services, build_services_with};
pub use pipeline::{FAILED_TEXT, MessagePipeline, Outcome, PipelineSettings, Stage};
pub use router::IncomingMessageRouter;
