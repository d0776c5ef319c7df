mod signature;

pub use signature::{ScopeSignPolicy, SignatureMiddlewareFactory, SignatureMiddlewareService};
