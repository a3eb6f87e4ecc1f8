//! Wire protocol and request loop for the PHP AST driver.
//!
//! A peer process writes analysis requests to the driver's standard input
//! and reads one response per request from its standard output. This crate
//! owns everything between those two streams except the parser itself:
//!
//! - [`codec`] frames and decodes records as line-delimited JSON or buffered
//!   MessagePack
//! - [`protocol`] validates requests and assembles responses
//! - [`failure`] classifies per-record failures into response statuses
//! - [`extractor`] defines the seam a parser implements
//! - [`driver`] runs the sequential decode, dispatch, and write loop
//!
//! The parser lives in `phpast-syntax`; the binary wiring lives in
//! `phpast-driver`.

pub mod codec;
pub mod driver;
pub mod extractor;
pub mod failure;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use codec::{Codec, CodecOptions, Pull, WireFormat};
pub use driver::{Driver, DriverError, DriverState, RunSummary};
pub use extractor::{Extractor, SyntaxFailure};
pub use failure::{Failure, FailureKind};
pub use protocol::{Ast, Identity, Record, Request, Response, Status};
