//! Request dispatch contract shared by generated clients and their hosts.
//!
//! Generated client implementations never talk to the network themselves. Each
//! method call is turned into a [`RequestDescription`] and handed to a
//! [`Dispatcher`]:
//! * [`Dispatcher::send`]: void-shaped calls
//! * [`Dispatcher::send_for_value`]: value-shaped calls, decoded with [`decode`]
//!
//! Runtime arguments travel as [`Value`]s so that loaded implementations can be
//! driven without compile-time knowledge of the declaring trait.

#![warn(missing_docs)]

pub mod dispatch;
pub mod request;
pub mod value;

pub use dispatch::{DispatchError, DispatchResult, Dispatcher, decode};
pub use request::{Binding, Method, RequestDescription};
pub use value::{Value, ValueKind};
