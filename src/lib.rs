pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod pages;
pub mod router;
pub mod session;

pub use console::{Console, ConsoleBuilder};
pub use error::{GatewayError, SessionError};
pub use gateway::{Expect, Payload, RequestGateway, RequestOptions};
pub use router::{Navigation, NavigationGuard};
pub use session::{SessionManager, SessionProfile};
