pub mod broadcast;
pub mod info;
pub mod packet;
pub mod profile;
pub mod request;
pub mod role;
pub mod setting;
pub mod talk;

pub use broadcast::*;
pub use info::*;
pub use packet::*;
pub use profile::*;
pub use request::*;
pub use role::*;
pub use setting::*;
pub use talk::*;
