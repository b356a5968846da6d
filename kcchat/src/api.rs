pub mod portal;

pub use portal::{PortalApi, PortalClient};
