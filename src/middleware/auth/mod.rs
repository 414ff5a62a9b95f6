pub mod access;

pub use access::{ACCESS_JWT_HEADER, AccessGate, AccessGateLayer};
