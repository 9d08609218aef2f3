//! Id-based merge of a remote batch into local quotes.

use crate::model::conflict::ConflictRecord;
use crate::model::quote::Quote;
use log::warn;

/// Counters and conflicts produced by one `reconcile` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub appended: usize,
    pub overwritten: usize,
    /// Remote entries ignored because they lack an id or content.
    pub skipped: usize,
    pub conflicts: Vec<ConflictRecord>,
}

impl MergeOutcome {
    /// Number of local changes made.
    pub fn applied(&self) -> usize {
        self.appended + self.overwritten
    }
}

/// Merges `batch` into `local`, server winning on divergence.
///
/// Per remote quote:
/// - id unknown locally: appended;
/// - id known, text or category differs: local overwritten in place and a
///   conflict recorded with the pre-overwrite local version;
/// - id known, identical content: no-op.
pub fn reconcile(local: &mut Vec<Quote>, batch: Vec<Quote>) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for server in batch {
        let Some(server_id) = server.id else {
            outcome.skipped += 1;
            continue;
        };
        if server.validate().is_err() {
            warn!(
                "event=sync_skip module=sync status=skipped id={server_id} reason=blank_field"
            );
            outcome.skipped += 1;
            continue;
        }

        match local.iter().position(|quote| quote.id == Some(server_id)) {
            Some(index) => {
                if local[index].same_content(&server) {
                    continue;
                }
                let previous = std::mem::replace(&mut local[index], server.clone());
                outcome.conflicts.push(ConflictRecord::new(previous, server));
                outcome.overwritten += 1;
            }
            None => {
                local.push(server);
                outcome.appended += 1;
            }
        }
    }

    outcome
}
