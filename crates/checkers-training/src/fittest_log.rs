//! Append-only CSV log of the elite genome of every generation.
//!
//! The header row holds the weight names ([`Genome::NAMES`]) and is written
//! once, when the file is first created. Later runs append below the rows of
//! earlier ones. Each [`FittestLog::append`] writes one row and flushes, so the
//! file is usable while training is still running.
//!
//! Logging never fails training: the first I/O error is reported with
//! `log::warn!` and recording stops for the rest of the run.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use checkers_evaluator::Genome;
use csv::{Writer, WriterBuilder};

/// CSV log of fittest genomes, one row per generation.
#[derive(Debug)]
pub struct FittestLog {
    path: PathBuf,
    writer: Option<Writer<File>>,
}

impl FittestLog {
    /// Opens the log at `path` for appending, creating it if needed.
    ///
    /// The header row is written only when the file is empty. If the file
    /// cannot be opened the returned log is disabled.
    pub fn create<P>(path: P) -> Self
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_path_buf();
        let writer = match open_with_header(&path) {
            Ok(writer) => Some(writer),
            Err(e) => {
                log::warn!(
                    "cannot open fittest log {}: {e}; recording disabled",
                    path.display()
                );
                None
            }
        };
        Self { path, writer }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` while rows are still being recorded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Appends `genome` as one row.
    pub fn append(&mut self, genome: &Genome) {
        let Some(writer) = &mut self.writer else {
            return;
        };
        let result = writer
            .serialize(genome)
            .and_then(|()| writer.flush().map_err(csv::Error::from));
        if let Err(e) = result {
            log::warn!(
                "cannot write fittest log {}: {e}; recording disabled",
                self.path.display()
            );
            self.writer = None;
        }
    }
}

fn open_with_header(path: &Path) -> csv::Result<Writer<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;
    // header written explicitly so that a run without generations still gets one
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if is_empty {
        writer.write_record(Genome::NAMES)?;
        writer.flush()?;
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("checkers-{}-{name}.csv", process::id()))
    }

    #[test]
    fn test_header_then_one_row_per_append() {
        let path = temp_path("rows");
        let _ = fs::remove_file(&path);
        let mut log = FittestLog::create(&path);
        assert!(log.is_enabled());
        assert_eq!(log.path(), path);

        let genome = Genome::from_weights([1.0, 1.5, 3.0, 0.1, 0.2, 0.1, 0.05, -0.1, 0.0]);
        log.append(&genome);
        log.append(&Genome::from_weights([0.5; Genome::LEN]));
        drop(log);

        let text = fs::read_to_string(&path).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], Genome::NAMES.join(","));
        assert_eq!(lines[1], "1.0,1.5,3.0,0.1,0.2,0.1,0.05,-0.1,0.0");
        assert_eq!(lines[2], vec!["0.5"; Genome::LEN].join(","));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_reopening_keeps_earlier_rows() {
        let path = temp_path("reopen");
        let _ = fs::remove_file(&path);

        let mut log = FittestLog::create(&path);
        log.append(&Genome::default());
        drop(log);

        let mut log = FittestLog::create(&path);
        assert!(log.is_enabled());
        log.append(&Genome::from_weights([0.5; Genome::LEN]));
        drop(log);

        let text = fs::read_to_string(&path).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        let header = Genome::NAMES.join(",");
        assert_eq!(lines.iter().filter(|&&line| line == header).count(), 1);
        assert_eq!(lines[0], header);
        assert_eq!(lines[1], "1.0,1.5,3.0,0.1,0.2,0.1,0.05,-0.1,0.0");
        assert_eq!(lines[2], vec!["0.5"; Genome::LEN].join(","));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_header_written_without_rows() {
        let path = temp_path("header-only");
        let _ = fs::remove_file(&path);
        drop(FittestLog::create(&path));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unopenable_path_disables_log() {
        let path = env::temp_dir()
            .join(format!("checkers-{}-missing-dir", process::id()))
            .join("log.csv");
        let mut log = FittestLog::create(&path);
        assert!(!log.is_enabled());
        // appending to a disabled log is a no-op
        log.append(&Genome::default());
        assert!(!path.exists());
    }
}
