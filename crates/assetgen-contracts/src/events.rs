use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{AssetGenError, Result};

pub type EventPayload = Map<String, Value>;

/// Append-only JSONL run log.
///
/// - default fields are `type`, `run_id`, `ts`
/// - caller payload is merged last and can override defaults
/// - one compact JSON object per line
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    run_id: String,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert("run_id".to_string(), Value::String(self.run_id.clone()));
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            event.insert(key, value);
        }

        let line = serde_json::to_string(&event).map_err(|err| self.failure(err))?;
        self.append(&line).map_err(|err| self.failure(err))?;
        Ok(Value::Object(event))
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")
    }

    fn failure(&self, err: impl std::fmt::Display) -> AssetGenError {
        AssetGenError::EventLog {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
