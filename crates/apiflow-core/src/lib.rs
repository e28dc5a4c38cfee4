//! Apiflow Core Library
//!
//! This library provides the value model shared by API-description importers
//! and exporters: constraints, parameters that generate example values from
//! them, template strings with named placeholders, and a URL entity built on
//! top of all three.

pub mod config;
pub mod constraint;
pub mod error;
pub mod parameter;
pub mod sequence;
pub mod url;

pub use crate::{
    config::{Delimiter, GenerationOptions},
    constraint::{Constraint, Pattern},
    error::{Error, Result},
    parameter::{Parameter, ParameterType},
    sequence::{Segment, Sequence},
    url::{Component, Url, UrlBuilder, UrlField, UrlObject},
};
