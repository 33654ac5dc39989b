//! Plain data types shared by the controller and transports.
//!
//! Nothing here performs I/O; request configuration, progress payloads and
//! settled responses are passed by value between layers.

pub mod init;
pub mod progress;
pub mod response;

pub use init::RequestInit;
pub use progress::{EventName, ProgressCallback, ProgressEvent};
pub use response::Response;
