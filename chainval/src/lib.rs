#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod environment;
pub mod revocation;
pub mod source;
pub mod util;
pub mod validator;

pub use crate::environment::*;
pub use crate::revocation::*;
pub use crate::{source::*, util::*, validator::*};
