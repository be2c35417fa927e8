//! Binding to the PDFium dynamic library.
//!
//! `Pdfium::default()` panics when no library is found, which would take a
//! server worker down with it. Binding here returns a `Result` instead and
//! searches, in order:
//!
//! 1. the explicit path from [`crate::config::AnalyzerConfig::pdfium_lib_path`]
//! 2. `PDFIUM_LIB_PATH`
//! 3. the directory of the running executable
//! 4. the system library search path
//!
//! A fresh `Pdfium` is bound per operation inside `spawn_blocking`; the OS
//! caches the `dlopen`, so repeat binds are cheap.

use crate::error::AnalyzerError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Bind to a pdfium library, trying each location in turn.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, AnalyzerError> {
    if let Some(path) = explicit {
        return bind_file(path);
    }

    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        if !path.is_empty() {
            return bind_file(Path::new(&path));
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate =
                Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&candidate) {
                debug!(dir = %dir.display(), "Bound pdfium next to executable");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| AnalyzerError::PdfiumBindingFailed(format!("{e:?}")))?;
    debug!("Bound system pdfium");
    Ok(Pdfium::new(bindings))
}

fn bind_file(path: &Path) -> Result<Pdfium, AnalyzerError> {
    let bindings = Pdfium::bind_to_library(path).map_err(|e| {
        AnalyzerError::PdfiumBindingFailed(format!("{}: {e:?}", path.display()))
    })?;
    debug!(path = %path.display(), "Bound pdfium from explicit path");
    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_library_is_an_error() {
        let err = bind_pdfium(Some(Path::new("/definitely/not/libpdfium.so")))
            .err()
            .expect("binding a missing file must fail");
        assert!(matches!(err, AnalyzerError::PdfiumBindingFailed(_)));
        assert!(err.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
