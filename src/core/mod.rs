pub mod gateway;
pub mod local;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod router;
