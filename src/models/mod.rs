pub mod connection;
pub mod result;

pub use connection::{Connection, ConnectionPatch, CredentialMap, NewConnection};
pub use result::CommandResult;
