//! Terminal presentation of application state.

pub mod views;
