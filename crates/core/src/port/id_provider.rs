// Job Id Provider Port (for deterministic direct-mode ids in tests)

/// Id provider interface. Direct mode synthesizes job ids locally
/// instead of receiving them from the queue service.
pub trait IdProvider: Send + Sync {
    fn new_job_id(&self) -> String;
}

/// UUID v4 provider (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn new_job_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
