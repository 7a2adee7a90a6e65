pub mod middleware;
pub mod request_id;

pub use middleware::{optional_auth_middleware, AuthUser};
pub use request_id::{request_id_middleware, RequestId};
