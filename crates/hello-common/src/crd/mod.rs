//! Custom Resource Definitions for the hello operator

mod hello;

pub use hello::{Hello, HelloSpec, HelloStatus, HELLO_API_GROUP, HELLO_CRD_NAME};
