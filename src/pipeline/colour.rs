//! Colour space normaliser: make sure the letter reaches the printer as CMYK.
//!
//! Detection looks at the colour spaces of embedded images. A document is
//! left alone when it already has CMYK images and no RGB ones; anything else
//! is sent through ghostscript's `pdfwrite` device with a CMYK conversion
//! strategy.

use crate::engine::{ColourConverter, ColourModel, ColourProfile, PdfEngine};
use crate::error::SanitiseError;
use std::borrow::Cow;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Convert to CMYK unless the profile says the document is print-ready.
pub fn normalise_colour<'a>(
    converter: &dyn ColourConverter,
    pdf: &'a [u8],
) -> Result<Cow<'a, [u8]>, SanitiseError> {
    let profile = converter.profile(pdf)?;
    if profile.is_print_ready() {
        debug!("Colour profile already print-ready: {:?}", profile);
        return Ok(Cow::Borrowed(pdf));
    }
    info!(
        "Converting to CMYK (cmyk: {}, rgb: {})",
        profile.contains_cmyk, profile.contains_rgb
    );
    Ok(Cow::Owned(converter.convert_to_cmyk(pdf)?))
}

/// Ghostscript arguments for an stdin-to-stdout CMYK rewrite.
const GS_ARGS: &[&str] = &[
    "-q",
    "-o",
    "-",
    "-dCompatibilityLevel=1.7",
    "-sDEVICE=pdfwrite",
    "-sColorConversionStrategy=CMYK",
    "-dBandBufferSpace=100000000",
    "-dBufferSpace=100000000",
    "-dMaxPatternBitmap=1000000",
    "-dAutoRotatePages=/None",
    "-c",
    "100000000 setvmthreshold",
    "-f",
    "-",
];

/// [`ColourConverter`] that shells out to ghostscript.
///
/// Detection is delegated to the engine's image colour models.
pub struct GhostscriptConverter {
    executable: PathBuf,
    timeout: Duration,
    engine: Arc<dyn PdfEngine>,
}

impl GhostscriptConverter {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration, engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            engine,
        }
    }

    pub fn args() -> &'static [&'static str] {
        GS_ARGS
    }
}

fn conversion_failed(stderr: impl Into<String>) -> SanitiseError {
    SanitiseError::ColourConversionFailed {
        code: None,
        stderr: stderr.into(),
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    })
}

fn joined(
    handle: thread::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, SanitiseError> {
    handle
        .join()
        .map_err(|_| SanitiseError::Internal("ghostscript pipe thread panicked".into()))?
        .map_err(|e| conversion_failed(e.to_string()))
}

impl ColourConverter for GhostscriptConverter {
    fn profile(&self, pdf: &[u8]) -> Result<ColourProfile, SanitiseError> {
        let models: Vec<ColourModel> = self.engine.image_colour_models(pdf)?;
        Ok(ColourProfile::from_models(&models))
    }

    fn convert_to_cmyk(&self, pdf: &[u8]) -> Result<Vec<u8>, SanitiseError> {
        let mut child = Command::new(&self.executable)
            .args(GS_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                conversion_failed(format!(
                    "could not start {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| conversion_failed("ghostscript did not expose stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| conversion_failed("ghostscript did not expose stderr"))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| conversion_failed("ghostscript did not expose stdin"))?;

        let stdout_reader = drain(stdout);
        let stderr_reader = drain(stderr);
        let input = pdf.to_vec();
        let writer = thread::spawn(move || stdin.write_all(&input));

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() > self.timeout {
                        warn!("ghostscript exceeded {:?}; killing", self.timeout);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(SanitiseError::Timeout {
                            stage: "CMYK conversion",
                            secs: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(conversion_failed(e.to_string()));
                }
            }
        };

        // A broken pipe here just means ghostscript stopped reading early;
        // the exit status below says whether that mattered.
        let _ = writer.join();
        let out = joined(stdout_reader)?;
        let err = joined(stderr_reader)?;

        if !status.success() {
            return Err(SanitiseError::ColourConversionFailed {
                code: status.code(),
                stderr: String::from_utf8_lossy(&err).into_owned(),
            });
        }
        info!(
            "ghostscript converted {} → {} bytes in {:?}",
            pdf.len(),
            out.len(),
            started.elapsed()
        );
        Ok(out)
    }
}
