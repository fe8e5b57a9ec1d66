//! Domain types of a Purs Transaction Bundle and the ports through which
//! bundle runs reach the store.

pub mod bundle;
pub mod identifier;
pub mod parameters;
pub mod ports;
pub mod purchase;
