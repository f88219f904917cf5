//! Persists a received coupon as a single line.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audit::AuditLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// No coupon, nothing written.
    Skipped,
    Failed(String),
}

/// Writes `coupon` plus a newline to `path`, replacing earlier content.
/// Failures are logged and reported, never propagated.
pub fn save_coupon(log: &AuditLog, coupon: Option<&str>, path: &Path) -> SaveOutcome {
    let Some(coupon) = coupon.filter(|coupon| !coupon.is_empty()) else {
        log.warning("Nessun coupon da salvare.");
        return SaveOutcome::Skipped;
    };

    match fs::write(path, format!("{coupon}\n")) {
        Ok(()) => {
            log.info(&format!("Coupon salvato in: {}", path.display()));
            log.println(&format!("(Coupon salvato in: {})", path.display()));
            SaveOutcome::Saved(path.to_path_buf())
        }
        Err(err) => {
            log.error(&format!("Errore scrittura file: {err}"));
            log.println(&format!("Errore scrittura file: {err}"));
            SaveOutcome::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::tests::captured_log;
    use log::LevelFilter;

    #[test]
    fn overwrites_with_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupon.txt");
        fs::write(&path, "OLD\nSTALE\n").unwrap();
        let (log, file, console) = captured_log(LevelFilter::Info, false);

        let outcome = save_coupon(&log, Some("ABC123"), &path);

        assert_eq!(outcome, SaveOutcome::Saved(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "ABC123\n");
        assert!(file.contents().contains("INFO Coupon salvato in:"));
        assert!(console.contents().contains("(Coupon salvato in:"));
    }

    #[test]
    fn missing_coupon_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupon.txt");
        let (log, file, _) = captured_log(LevelFilter::Info, false);

        assert_eq!(save_coupon(&log, None, &path), SaveOutcome::Skipped);
        assert!(!path.exists());
        assert!(file.contents().contains("WARNING Nessun coupon da salvare."));
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("coupon.txt");
        let (log, file, console) = captured_log(LevelFilter::Info, false);

        let outcome = save_coupon(&log, Some("ABC123"), &path);

        assert!(matches!(outcome, SaveOutcome::Failed(_)));
        assert!(file.contents().contains("ERROR Errore scrittura file:"));
        assert!(console.contents().contains("Errore scrittura file:"));
    }
}
