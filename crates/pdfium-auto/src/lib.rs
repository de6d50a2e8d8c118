//! # pdfium-auto
//!
//! Find a [PDFium](https://pdfium.googlesource.com/pdfium/) shared library
//! for `pdfium-render`, downloading and caching one on first use when none is
//! installed.
//!
//! ## Lookup order
//!
//! [`bind_pdfium`] and [`ensure_pdfium_library`] try, first match wins:
//!
//! 1. `PDFIUM_LIB_PATH`: the library file, or a directory holding it.
//! 2. The working directory (`./libpdfium.so`, `./libpdfium.dylib`, `./pdfium.dll`).
//! 3. The per-version cache, `{cache}/pdf2cards/pdfium-{VERSION}/`.
//! 4. A download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//!    into that cache, unless `PDFIUM_AUTO_DOWNLOAD=0`.
//!
//! If all of these fail, [`bind_pdfium`] makes a last attempt through the
//! system loader before reporting the original error.
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium_silent, ensure_pdfium_library};
//!
//! // Warm the cache up front, reporting download progress.
//! ensure_pdfium_library(Some(&|done, total| {
//!     eprint!("\rPDFium: {done}/{} bytes", total.unwrap_or(0));
//! }))
//! .expect("PDFium unavailable");
//!
//! let pdfium = bind_pdfium_silent().expect("bind failed");
//! ```
//!
//! ## Environment
//!
//! - `PDFIUM_LIB_PATH`: existing library (file or directory); skips the download.
//! - `PDFIUM_AUTO_CACHE_DIR`: replaces the platform cache root.
//! - `PDFIUM_AUTO_DOWNLOAD`: `0` / `false` / `no` / `off` disables the download.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Public constants ─────────────────────────────────────────────────────────

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

/// GitHub release base URL.
const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Directory name under the platform cache root.
const CACHE_APP_DIR: &str = "pdf2cards";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned while locating, downloading or binding PDFium.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    /// The current OS/architecture combination has no published binary.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create or write the cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// No library on disk and `PDFIUM_AUTO_DOWNLOAD` turned the download off.
    #[error("PDFium not found in {searched}, and PDFIUM_AUTO_DOWNLOAD is off")]
    DownloadDisabled { searched: String },

    /// gzip/tar extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// `pdfium-render` could not load the library.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

// ── Platform metadata ────────────────────────────────────────────────────────

struct PlatformInfo {
    /// Asset filename in the GitHub release, e.g. `pdfium-linux-x64.tgz`.
    archive_name: &'static str,
    /// Path of the library inside the archive, e.g. `lib/libpdfium.so`.
    lib_path_in_archive: String,
    /// Filename on disk.
    lib_name: &'static str,
}

fn detect_platform() -> Result<PlatformInfo, PdfiumAutoError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    let (archive_name, lib_dir, lib_name) = match (os, arch) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", "lib", "libpdfium.dylib"),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", "lib", "libpdfium.dylib"),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib", "libpdfium.so"),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib", "libpdfium.so"),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin", "pdfium.dll"),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin", "pdfium.dll"),
        ("windows", "x86") => ("pdfium-win-x86.tgz", "bin", "pdfium.dll"),
        (os, arch) => {
            return Err(PdfiumAutoError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };

    Ok(PlatformInfo {
        archive_name,
        lib_path_in_archive: format!("{lib_dir}/{lib_name}"),
        lib_name,
    })
}

/// Platform filename of the PDFium library (`libpdfium.so`, ...).
pub fn library_name() -> Result<&'static str, PdfiumAutoError> {
    detect_platform().map(|info| info.lib_name)
}

// ── Cache directory ──────────────────────────────────────────────────────────

/// Per-version cache directory for the downloaded library.
///
/// - **macOS**: `~/Library/Caches/pdf2cards/pdfium-{VERSION}/`
/// - **Linux**: `~/.cache/pdf2cards/pdfium-{VERSION}/`
/// - **Windows**: `%LOCALAPPDATA%\pdf2cards\pdfium-{VERSION}\`
///
/// `PDFIUM_AUTO_CACHE_DIR` replaces the root.
pub fn pdfium_cache_dir() -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Some(root) = std::env::var_os("PDFIUM_AUTO_CACHE_DIR") {
        return PathBuf::from(root).join(versioned);
    }

    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_APP_DIR)
        .join(versioned)
}

// ── Lookup ───────────────────────────────────────────────────────────────────

/// `path` itself, or the platform library inside it when it is a directory.
fn library_at(path: &Path, lib_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(lib_name)
    } else {
        path.to_path_buf()
    }
}

/// On-disk locations checked before any download, in order.
pub fn local_candidates() -> Result<Vec<PathBuf>, PdfiumAutoError> {
    let lib_name = library_name()?;
    let mut candidates = Vec::with_capacity(3);
    if let Some(env_path) = std::env::var_os("PDFIUM_LIB_PATH") {
        let path = library_at(Path::new(&env_path), lib_name);
        if !path.is_file() {
            warn!("PDFIUM_LIB_PATH '{}' has no PDFium library", path.display());
        }
        candidates.push(path);
    }
    candidates.push(Path::new(".").join(lib_name));
    candidates.push(pdfium_cache_dir().join(lib_name));
    Ok(candidates)
}

/// The first local candidate that exists, if any.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    local_candidates()
        .ok()?
        .into_iter()
        .find(|candidate| candidate.is_file())
}

/// `true` when a library is already on disk (no download on the next bind).
pub fn is_pdfium_cached() -> bool {
    cached_pdfium_path().is_some()
}

fn flag_enabled(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
    }
}

fn download_enabled() -> bool {
    flag_enabled(std::env::var("PDFIUM_AUTO_DOWNLOAD").ok().as_deref())
}

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Path to a usable PDFium library, downloading it into the cache if needed.
///
/// `on_progress` receives `(bytes_downloaded, total_bytes)` during a download.
/// The result is remembered for the rest of the process.
pub fn ensure_pdfium_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = match cached_pdfium_path() {
        Some(path) => {
            debug!("Using PDFium at {}", path.display());
            path
        }
        None if download_enabled() => download_to_cache(on_progress)?,
        None => {
            let searched = local_candidates()?
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PdfiumAutoError::DownloadDisabled { searched });
        }
    };

    // Concurrent first calls may both resolve; either value is correct.
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Bind PDFium through [`ensure_pdfium_library`], then the system loader.
pub fn bind_pdfium(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Pdfium, PdfiumAutoError> {
    match ensure_pdfium_library(on_progress) {
        Ok(path) => bind_pdfium_from_path(&path),
        Err(err) => {
            warn!("{err}; trying the system library");
            Pdfium::bind_to_system_library()
                .map(Pdfium::new)
                .map_err(|_| err)
        }
    }
}

/// [`bind_pdfium`] without download progress.
pub fn bind_pdfium_silent() -> Result<Pdfium, PdfiumAutoError> {
    bind_pdfium(None)
}

/// Bind the library at `path` (a file, or a directory holding it).
///
/// Never downloads.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    let lib = library_at(path, library_name()?);
    Pdfium::bind_to_library(&lib)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: lib,
            reason: e.to_string(),
        })
}

// ── Download ─────────────────────────────────────────────────────────────────

fn download_to_cache(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    let info = detect_platform()?;
    let cache_dir = pdfium_cache_dir();
    let lib_path = cache_dir.join(info.lib_name);
    let url = format!(
        "{}/chromium%2F{}/{}",
        BASE_URL, PDFIUM_VERSION, info.archive_name
    );

    info!("Downloading PDFium {} from {}", PDFIUM_VERSION, url);
    std::fs::create_dir_all(&cache_dir).map_err(PdfiumAutoError::CacheDir)?;

    let archive_bytes = download_bytes(&url, on_progress)?;

    // Unpack beside the target and rename, so a crash never leaves a
    // truncated library where the next run would pick it up.
    let partial = cache_dir.join(format!("{}.part", info.lib_name));
    extract_library(&archive_bytes, &info.lib_path_in_archive, &partial)?;
    std::fs::rename(&partial, &lib_path).map_err(PdfiumAutoError::CacheDir)?;

    info!("PDFium cached at {}", lib_path.display());
    Ok(lib_path)
}

/// Reads a URL into memory, calling `on_progress` every 64 KiB.
fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(32 * 1024 * 1024) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    let mut downloaded: u64 = 0;

    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("Read error: {e}"))),
        }
    }

    Ok(buf)
}

/// Extracts the single entry `lib_path_in_archive` of a `.tgz` to `dest_path`.
fn extract_library(
    archive_bytes: &[u8],
    lib_path_in_archive: &str,
    dest_path: &Path,
) -> Result<(), PdfiumAutoError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let mut archive = Archive::new(GzDecoder::new(archive_bytes));
    let entries = archive
        .entries()
        .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        let matches = entry
            .path()
            .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?
            .to_string_lossy()
            == lib_path_in_archive;
        if matches {
            entry
                .unpack(dest_path)
                .map_err(|e| PdfiumAutoError::Extract(format!("Unpack failed: {e}")))?;
            return Ok(());
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "Library '{}' not found in archive",
        lib_path_in_archive
    )))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
