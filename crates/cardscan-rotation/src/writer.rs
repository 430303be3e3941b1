//! Output writer: appends records into whatever the bucket store reports as
//! the active bucket.
//!
//! Records are JSON lines, one file per record kind, plus standalone JSON
//! payload files for saved responses. The writer only ever asks the store
//! for the current-period path; it never touches the scheduler or archiver.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use cardscan_core::config::OutputCategory;

use crate::error::Result;
use crate::store::BucketStore;

/// Kind of log record, each landing in its own file inside the active
/// logs bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ApiRequest,
    AppResponse,
    Error,
}

impl RecordKind {
    pub fn file_name(self) -> &'static str {
        match self {
            RecordKind::ApiRequest => "api_requests.log",
            RecordKind::AppResponse => "app_responses.log",
            RecordKind::Error => "errors.log",
        }
    }
}

/// Appends request/response/error records and saves response payloads into
/// the active buckets.
pub struct OutputWriter {
    store: Arc<BucketStore>,
    // Serializes appends so concurrent request handlers cannot interleave
    // partial lines.
    append_lock: Mutex<()>,
}

impl OutputWriter {
    pub fn new(store: Arc<BucketStore>) -> Self {
        Self {
            store,
            append_lock: Mutex::new(()),
        }
    }

    /// Fresh request id for correlating records across files.
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Record an incoming API request.
    pub fn log_api_request(
        &self,
        request_id: &str,
        endpoint: &str,
        detail: Value,
    ) -> Result<()> {
        self.append(
            RecordKind::ApiRequest,
            json!({
                "timestamp": Local::now().to_rfc3339(),
                "request_id": request_id,
                "endpoint": endpoint,
                "detail": detail,
            }),
        )
    }

    /// Record the application-level response outcome.
    pub fn log_app_response(
        &self,
        request_id: &str,
        response_status: &str,
        detail: Value,
    ) -> Result<()> {
        self.append(
            RecordKind::AppResponse,
            json!({
                "timestamp": Local::now().to_rfc3339(),
                "request_id": request_id,
                "response_status": response_status,
                "detail": detail,
            }),
        )
    }

    /// Record an error.
    pub fn log_error(
        &self,
        request_id: &str,
        error_type: &str,
        error_message: &str,
    ) -> Result<()> {
        self.append(
            RecordKind::Error,
            json!({
                "timestamp": Local::now().to_rfc3339(),
                "request_id": request_id,
                "error_type": error_type,
                "error_message": error_message,
            }),
        )
    }

    /// Save a response payload as `response_{request_id}.json` in the
    /// active responses bucket. Returns the written path.
    pub fn save_response(&self, request_id: &str, payload: &Value) -> Result<PathBuf> {
        let dir = self.store.current_bucket_dir(OutputCategory::Responses)?;
        let path = dir.join(format!("response_{request_id}.json"));
        let data = serde_json::to_vec_pretty(payload)?;
        fs::write(&path, data)?;
        Ok(path)
    }

    fn append(&self, kind: RecordKind, record: Value) -> Result<()> {
        let dir = self.store.current_bucket_dir(OutputCategory::Logs)?;
        let path = dir.join(kind.file_name());
        let line = serde_json::to_string(&record)?;

        let _guard = self.append_lock.lock();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
