pub mod error;
pub mod requests;


pub use error::{GatewayError, Result};
pub use requests::{ConsistencyLevel, JoinRequest, KeyValues, ServiceJoinRequest};
