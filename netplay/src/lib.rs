pub mod codec;
pub mod connection;
pub mod error;
pub mod ip_discovery;
pub mod listener;
pub mod player;
pub mod recorder;

pub use connection::{Connection, LinkState};
pub use error::{ConnectionError, TransportError};
pub use listener::Listener;
pub use player::{PlayerSession, PlayerStatus};
pub use recorder::{RecorderSession, RecorderStatus, SendOutcome, bind_listener};
