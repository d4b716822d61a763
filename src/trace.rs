/// Query lifecycle logging hooks.
///
/// Advisory hooks emitted around record CRUD calls: the rendered statement
/// for select/insert/update, the table identity for delete, and the
/// normalized response. They are pure observability; execution outcomes do
/// not depend on whether a subscriber is installed.
use tracing::{debug, warn};

use crate::query::Query;

pub fn log_select(q: &Query) {
    debug!(statement = %q, "SELECT");
}

pub fn log_insert(q: &Query) {
    debug!(statement = %q, "INSERT");
}

pub fn log_update(q: &Query) {
    debug!(statement = %q, "UPDATE");
}

/// Deletes are logged at warn level so destructive statements stand out.
pub fn log_delete(table: &str) {
    warn!(table = %table, "DELETE");
}

pub fn log_response(result: &serde_json::Value) {
    debug!(response = %result, "RESPONSE");
}
