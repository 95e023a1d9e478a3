//! Post-order folding of the walked tree into flat [`FolderStats`].

use canopy_core::{FolderStats, NodeId};

use crate::walker::{FolderNode, Totals};

/// Flatten `root` into folder records with subtree totals filled in.
///
/// Children are emitted before their parent. The root is always last.
pub(crate) fn flatten(root: FolderNode) -> Vec<FolderStats> {
    let mut out = Vec::new();
    fold(root, None, &mut out);
    out
}

fn fold(node: FolderNode, parent_id: Option<NodeId>, out: &mut Vec<FolderStats>) -> Totals {
    let FolderNode {
        id,
        path,
        name,
        depth,
        children,
        direct,
    } = node;

    let mut total = direct;
    let subfolder_count = children.len() as u64;
    let mut children_ids = Vec::with_capacity(children.len());
    for child in children {
        children_ids.push(child.id);
        let child_total = fold(child, Some(id), out);
        total.merge(&child_total);
    }

    out.push(FolderStats {
        id,
        path,
        name,
        depth,
        parent_id,
        direct_size: direct.size,
        direct_file_count: direct.files,
        direct_breakdown: direct.breakdown,
        total_size: total.size,
        file_count: total.files,
        subfolder_count,
        type_breakdown: total.breakdown,
        children_ids,
    });
    total
}
