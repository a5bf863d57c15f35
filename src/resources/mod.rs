pub mod common;
pub mod deployment;
pub mod ingress;
pub mod service;
