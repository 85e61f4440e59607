//! Append-only JSONL files under the output directory

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{KeeperError, KeeperResult};
use crate::strategy::OpportunityRecord;

#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Appends one record to `{dir}/journal/{stream}_{date}.jsonl`.
    pub fn append<T: Serialize>(&self, stream: &str, record: &T) -> KeeperResult<PathBuf> {
        let path = self.write_line("journal", stream, record)?;
        debug!(stream, file = %path.display(), "Journal record appended");
        Ok(path)
    }

    /// Audit snapshot in `{dir}/opportunities/arbitrage_{date}.jsonl`.
    pub fn save_opportunity(&self, record: &OpportunityRecord<'_>) -> KeeperResult<PathBuf> {
        let path = self.write_line("opportunities", "arbitrage", record)?;
        info!(
            audit_id = %record.id,
            cycle_id = record.cycle_id,
            strategy = %record.opportunity.strategy,
            profit = %record.estimated_profit,
            "Saved arbitrage opportunity"
        );
        Ok(path)
    }

    fn write_line<T: Serialize>(&self, folder: &str, prefix: &str, record: &T) -> KeeperResult<PathBuf> {
        let folder = self.dir.join(folder);
        fs::create_dir_all(&folder).map_err(|e| KeeperError::Store {
            context: format!("create {}: {e}", folder.display()),
        })?;

        let filename = folder.join(format!("{prefix}_{}.jsonl", Utc::now().format("%Y-%m-%d")));
        let line = serde_json::to_string(record).map_err(|e| KeeperError::Store {
            context: format!("serialize {prefix} record: {e}"),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)
            .map_err(|e| KeeperError::Store {
                context: format!("open {}: {e}", filename.display()),
            })?;
        writeln!(file, "{line}").map_err(|e| KeeperError::Store {
            context: format!("write {}: {e}", filename.display()),
        })?;

        Ok(filename)
    }
}
