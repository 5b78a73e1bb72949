//! The read-process-write loop every backend follows.
//!
//! A backend reads one [`WrapperRequest`] from a [`WrapperChannel`], hands it
//! to a [`ProcessWrapper`] and writes the [`WrapperResponse`] back. The
//! channel is usually stdin/stdout of a short-lived process but any
//! reader/writer pair works, which is how the builtin backends run in-process.

use std::any::Any;
use std::io::{self, BufRead, BufReader, Read, Stdin, Stdout, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use partcad_core::{WrapperRequest, WrapperResponse, PROTOCOL_VERSION};

use crate::error::{WrapperError, WrapperResult};

/// One unit of geometry work.
///
/// Implementations report every failure through
/// [`WrapperResponse::failure`]; they must not leave state behind that a
/// later request could observe.
pub trait ProcessWrapper {
    /// Performs the request on `path`.
    fn process(&self, path: &Path, request: &WrapperRequest) -> WrapperResponse;
}

/// Transport for one request and its response.
pub trait WrapperChannel {
    /// Reads the request and returns it together with its input path.
    fn handle_input(&mut self) -> WrapperResult<(PathBuf, WrapperRequest)>;

    /// Writes the response.
    fn handle_output(&mut self, response: &WrapperResponse) -> WrapperResult<()>;
}

/// A JSON channel over any reader/writer pair.
///
/// The request is the whole input (a single JSON document); the response is
/// written as one line.
#[derive(Debug)]
pub struct StdioChannel<R, W> {
    reader: R,
    writer: W,
}

impl StdioChannel<BufReader<Stdin>, Stdout> {
    /// Channel over the process standard streams.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdioChannel<R, W> {
    /// Creates a channel.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Returns the writer, e.g. to inspect a buffer in tests.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: BufRead, W: Write> WrapperChannel for StdioChannel<R, W> {
    fn handle_input(&mut self) -> WrapperResult<(PathBuf, WrapperRequest)> {
        let mut input = String::new();
        self.reader.read_to_string(&mut input)?;
        let request: WrapperRequest =
            serde_json::from_str(&input).map_err(WrapperError::InvalidRequest)?;
        Ok((request.path.clone(), request))
    }

    fn handle_output(&mut self, response: &WrapperResponse) -> WrapperResult<()> {
        let line = serde_json::to_string(response)
            .map_err(|e| WrapperError::invalid_response(e.to_string()))?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Runs `wrapper` on `request` behind the protocol guards.
///
/// Requests from a newer protocol are refused and a panic inside the
/// wrapper becomes a failed response.
pub fn process_guarded<P>(wrapper: &P, path: &Path, request: &WrapperRequest) -> WrapperResponse
where
    P: ProcessWrapper + ?Sized,
{
    if request.version > PROTOCOL_VERSION {
        return WrapperResponse::failure(
            WrapperError::UnsupportedVersion {
                found: request.version,
                supported: PROTOCOL_VERSION,
            }
            .to_string(),
        );
    }

    match panic::catch_unwind(AssertUnwindSafe(|| wrapper.process(path, request))) {
        Ok(response) => response,
        Err(payload) => WrapperResponse::failure(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("backend panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("backend panicked: {}", s)
    } else {
        "backend panicked".to_string()
    }
}

/// Serves exactly one request on `channel`.
///
/// An unreadable request is answered with a failed response rather than
/// dropped, so the caller always gets a document back. Only a failure to
/// write the response is returned as an error.
pub fn serve<P, C>(wrapper: &P, channel: &mut C) -> WrapperResult<WrapperResponse>
where
    P: ProcessWrapper + ?Sized,
    C: WrapperChannel + ?Sized,
{
    let response = match channel.handle_input() {
        Ok((path, request)) => process_guarded(wrapper, &path, &request),
        Err(e) => WrapperResponse::failure(e.to_string()),
    };
    channel.handle_output(&response)?;
    Ok(response)
}
