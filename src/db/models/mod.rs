#![allow(unused_imports)]

//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` pick up every row and draft type.

pub mod booking;
pub mod event;
pub mod rule;
pub mod slot;
pub mod time_format;

pub use self::booking::*;
pub use self::event::*;
pub use self::rule::*;
pub use self::slot::*;
pub use self::time_format::*;
