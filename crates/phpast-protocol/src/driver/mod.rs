//! The request-processing loop.
//!
//! The driver pulls records from a [`Codec`], validates each one, hands the
//! source text to an [`Extractor`], and writes exactly one response per
//! record in the order the records were decoded. Every per-record failure is
//! converted into a response; only a failing output stream ends the loop
//! early.

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{Codec, Decoded, Pull};
use crate::extractor::Extractor;
use crate::failure::{Failure, WRONG_REQUEST_FORMAT};
use crate::protocol::{Identity, Request, Response, Status};

/// Tracing target for driver events.
pub const DRIVER_TARGET: &str = "phpast::driver";

/// Consecutive read failures tolerated before the input is treated as closed.
pub const DEFAULT_MAX_TRANSPORT_FAILURES: usize = 16;

/// Lifecycle of a [`Driver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverState {
    /// Constructed, not yet running.
    #[default]
    Idle,
    /// Waiting on the input stream.
    Reading,
    /// Validating a pulled record.
    Decoding,
    /// Running the extractor.
    Dispatching,
    /// Discarding partial input after end-of-input.
    Draining,
    /// Finished.
    Closed,
}

/// Per-status response counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Responses with status `ok`.
    pub ok: usize,
    /// Responses with status `error`.
    pub error: usize,
    /// Responses with status `fatal`.
    pub fatal: usize,
}

impl RunSummary {
    /// Returns the number of responses written.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.error + self.fatal
    }

    const fn record(&mut self, status: Status) {
        match status {
            Status::Ok => self.ok += 1,
            Status::Error => self.error += 1,
            Status::Fatal | Status::Pending => self.fatal += 1,
        }
    }
}

/// Errors that end the loop without a response.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Writing a response to the output stream failed.
    #[error("failed to write response: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Neither the response nor any fallback for it could be encoded.
    #[error("failed to encode response: {failure}")]
    Encode {
        /// The last encoding failure.
        #[source]
        failure: Failure,
    },
}

/// Sequential request processor bound to one codec and one extractor.
#[derive(Debug)]
pub struct Driver<E> {
    codec: Codec,
    extractor: E,
    max_transport_failures: usize,
    state: DriverState,
}

impl<E: Extractor> Driver<E> {
    /// Creates a driver.
    #[must_use]
    pub const fn new(codec: Codec, extractor: E) -> Self {
        Self {
            codec,
            extractor,
            max_transport_failures: DEFAULT_MAX_TRANSPORT_FAILURES,
            state: DriverState::Idle,
        }
    }

    /// Sets how many consecutive read failures are answered before the input
    /// is treated as closed. Values below one are raised to one.
    #[must_use]
    pub fn with_max_transport_failures(mut self, limit: usize) -> Self {
        self.max_transport_failures = limit.max(1);
        self
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Processes records from `input` until end-of-input.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if a response cannot be written or if no
    /// encodable response exists for a record.
    pub fn run<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<RunSummary, DriverError>
    where
        R: BufRead,
        W: Write,
    {
        let mut summary = RunSummary::default();
        let mut transport_failures = 0_usize;
        info!(
            target: DRIVER_TARGET,
            format = self.codec.format().as_str(),
            "driver started"
        );

        loop {
            self.transition(DriverState::Reading);
            match self.codec.pull(input) {
                Ok(Pull::End) => break,
                Ok(Pull::Records(batch)) => {
                    transport_failures = 0;
                    for decoded in batch {
                        let response = self.dispatch(decoded);
                        self.emit(response, output, &mut summary)?;
                    }
                }
                Err(failure) => {
                    transport_failures += 1;
                    warn!(
                        target: DRIVER_TARGET,
                        error = %failure,
                        consecutive = transport_failures,
                        "input read failed"
                    );
                    let response =
                        Response::orphan().fail(&Failure::transport(WRONG_REQUEST_FORMAT));
                    self.emit(response, output, &mut summary)?;
                    if transport_failures >= self.max_transport_failures {
                        warn!(
                            target: DRIVER_TARGET,
                            limit = self.max_transport_failures,
                            "treating input as closed after repeated read failures"
                        );
                        break;
                    }
                }
            }
        }

        self.transition(DriverState::Draining);
        let discarded = self.codec.drain();
        output
            .flush()
            .map_err(|source| DriverError::Write { source })?;
        self.transition(DriverState::Closed);
        info!(
            target: DRIVER_TARGET,
            ok = summary.ok,
            error = summary.error,
            fatal = summary.fatal,
            discarded_bytes = discarded,
            "input closed"
        );
        Ok(summary)
    }

    fn dispatch(&mut self, decoded: Decoded) -> Response {
        self.transition(DriverState::Decoding);
        let record = match decoded {
            Ok(record) => record,
            Err(failure) => {
                debug!(target: DRIVER_TARGET, error = %failure, "record not decoded");
                return Response::orphan().fail(&failure);
            }
        };

        let request = match Request::from_record(&record) {
            Ok(request) => request,
            Err(failure) => {
                debug!(target: DRIVER_TARGET, error = %failure, "record rejected");
                return Response::builder(Identity::recover(&record)).fail(&failure);
            }
        };

        self.transition(DriverState::Dispatching);
        match self.extractor.extract(request.content()) {
            Ok(ast) => Response::for_request(&request).succeed(ast),
            Err(syntax) => {
                debug!(
                    target: DRIVER_TARGET,
                    name = request.identity().name(),
                    error = %syntax,
                    "source not parsed"
                );
                Response::for_request(&request).fail(&syntax.into())
            }
        }
    }

    fn emit<W: Write>(
        &self,
        response: Response,
        output: &mut W,
        summary: &mut RunSummary,
    ) -> Result<(), DriverError> {
        let identity = response.identity();
        let mut status = response.status();
        let payload = match self.codec.encode(&response.into_record()) {
            Ok(payload) => payload,
            Err(failure) => {
                warn!(
                    target: DRIVER_TARGET,
                    error = %failure,
                    "response not encodable, sending fallback"
                );
                status = failure.status();
                self.encode_fallback(identity, &failure)?
            }
        };

        write_line(output, &payload)?;
        summary.record(status);
        debug!(
            target: DRIVER_TARGET,
            status = status.as_str(),
            bytes = payload.len(),
            "response written"
        );
        Ok(())
    }

    fn encode_fallback(&self, identity: Identity, failure: &Failure) -> Result<Vec<u8>, DriverError> {
        let with_identity = Response::builder(identity).fail(failure).into_record();
        self.codec
            .encode(&with_identity)
            .or_else(|_| {
                // Identity values are arbitrary peer data and may themselves
                // be unencodable.
                let orphan = Response::orphan().fail(failure).into_record();
                self.codec.encode(&orphan)
            })
            .map_err(|last| DriverError::Encode { failure: last })
    }

    fn transition(&mut self, next: DriverState) {
        if self.state != next {
            debug!(
                target: DRIVER_TARGET,
                from = ?self.state,
                to = ?next,
                "state transition"
            );
            self.state = next;
        }
    }
}

/// Writes one response followed by a newline separator and flushes, so an
/// interactive peer sees each response as soon as it is produced.
fn write_line<W: Write>(output: &mut W, payload: &[u8]) -> Result<(), DriverError> {
    output
        .write_all(payload)
        .and_then(|()| output.write_all(b"\n"))
        .and_then(|()| output.flush())
        .map_err(|source| DriverError::Write { source })
}
