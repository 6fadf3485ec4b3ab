//! This crate follows the waste collection schedule of PGK Słupsk.
//!
//! The schedule is read from <https://pgkslupsk.pl/harmonogram-odbioru-odpadow>, cached on
//! disk and turned into "next pickup" sensors, a calendar and a few buttons. The street
//! directory of the older <https://pgkwywozy.infocity.pl> API helps finding a location.

pub use ical;

pub mod automation;
pub mod button;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod garbage_client;
pub mod rsc;
pub mod schedule;
pub mod scheduler;
pub mod sensor;
pub mod waste_type;

pub use error::{Error, Result};
