pub mod enforcer;
pub mod matcher;
pub mod store;

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Some rule matched; the request may proceed.
    Allow,
    /// No rule matched; the request is rejected.
    Deny,
}
