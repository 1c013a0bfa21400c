use std::collections::BTreeSet;
use std::sync::Arc;

use bingraph_binary::RecordIndex;
use bingraph_handler::TypeHandler;
use bingraph_types::{ObjectId, TypeId};

use crate::error::LoaderResult;

/// Result of a reachability scan over binary records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReachabilityScan {
    /// Ids reached that have a record.
    pub reachable: BTreeSet<ObjectId>,
    /// Ids referenced but absent from the scanned bytes.
    pub missing: BTreeSet<ObjectId>,
}

/// Walk the references of `index`'s records from `roots`.
pub fn scan_reachable<F>(
    index: &RecordIndex<'_>,
    roots: &[ObjectId],
    mut handler_for: F,
) -> LoaderResult<ReachabilityScan>
where
    F: FnMut(TypeId) -> LoaderResult<Arc<dyn TypeHandler>>,
{
    let mut scan = ReachabilityScan::default();
    let mut work: Vec<ObjectId> = roots.to_vec();

    while let Some(id) = work.pop() {
        if id.is_null() || scan.reachable.contains(&id) || scan.missing.contains(&id) {
            continue;
        }
        let Some(record) = index.record(id) else {
            scan.missing.insert(id);
            continue;
        };
        scan.reachable.insert(id);
        handler_for(record.type_id())?.iterate_loadable_references(record, &mut |child| {
            work.push(child)
        })?;
    }
    Ok(scan)
}
