//! Object ordering for pack writing.
//!
//! Git orders objects in a pack by type first (commits, then trees, then
//! blobs, then tags), and within a type, by similarity hints so that delta
//! candidates end up near each other: trees and blobs are grouped by the
//! path that named them, then by size (largest first, so later deltas
//! reference a bigger base already on hand).

use git_object::ObjectType;

/// Minimal per-object metadata needed to order a pack write.
///
/// `path_hint` is the path under which a blob or tree was last seen while
/// walking the object graph (commit/tag objects have none).
#[derive(Debug, Clone)]
pub struct OrderingEntry<T> {
    pub obj_type: ObjectType,
    pub size: u64,
    pub path_hint: Option<Vec<u8>>,
    pub payload: T,
}

/// Sort entries into pack write order.
///
/// Returns a new vector; does not touch anything else about `entries`
/// beyond their order.
pub fn order_for_pack<T>(mut entries: Vec<OrderingEntry<T>>) -> Vec<OrderingEntry<T>> {
    entries.sort_by(|a, b| {
        type_rank(a.obj_type)
            .cmp(&type_rank(b.obj_type))
            .then_with(|| a.path_hint.cmp(&b.path_hint))
            .then_with(|| b.size.cmp(&a.size))
    });
    entries
}

/// Git's canonical pack type ordering: commits, tags, trees, then blobs.
///
/// Commits are written first since they are the entry points consumers
/// resolve the pack from; blobs last since they are overwhelmingly the
/// bulk of the data and benefit most from grouping by path.
fn type_rank(t: ObjectType) -> u8 {
    match t {
        ObjectType::Commit => 0,
        ObjectType::Tag => 1,
        ObjectType::Tree => 2,
        ObjectType::Blob => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(obj_type: ObjectType, size: u64, path_hint: Option<&str>) -> OrderingEntry<()> {
        OrderingEntry {
            obj_type,
            size,
            path_hint: path_hint.map(|p| p.as_bytes().to_vec()),
            payload: (),
        }
    }

    #[test]
    fn commits_before_trees_before_blobs() {
        let entries = vec![
            entry(ObjectType::Blob, 10, Some("a.txt")),
            entry(ObjectType::Tree, 10, None),
            entry(ObjectType::Commit, 10, None),
        ];
        let ordered = order_for_pack(entries);
        assert_eq!(ordered[0].obj_type, ObjectType::Commit);
        assert_eq!(ordered[1].obj_type, ObjectType::Tree);
        assert_eq!(ordered[2].obj_type, ObjectType::Blob);
    }

    #[test]
    fn blobs_grouped_by_path_then_size_descending() {
        let entries = vec![
            entry(ObjectType::Blob, 5, Some("a.txt")),
            entry(ObjectType::Blob, 50, Some("a.txt")),
            entry(ObjectType::Blob, 20, Some("b.txt")),
        ];
        let ordered = order_for_pack(entries);
        assert_eq!(ordered[0].size, 50);
        assert_eq!(ordered[1].size, 5);
        assert_eq!(ordered[2].size, 20);
    }
}
