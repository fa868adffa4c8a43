mod clock;
mod config;
mod constants;
mod error;
mod judgment;
mod note;
mod protocol;
mod recorder;
mod session;

pub use clock::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use judgment::*;
pub use note::*;
pub use protocol::*;
pub use recorder::*;
pub use session::*;
