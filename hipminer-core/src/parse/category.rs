use crate::types::NodeCategory;

/// Type-name keywords that mark a node as a DOP regardless of where the
/// entry lives in the archive.
const DOP_TYPE_KEYWORDS: [&str; 7] = [
    "pyro", "flip", "rbd", "vellum", "solver", "gas", "bullet",
];

/// Path-segment patterns mapped to their contexts, checked in order.
const PATH_RULES: [(&str, NodeCategory); 9] = [
    ("dopnet", NodeCategory::Dop),
    ("/dop/", NodeCategory::Dop),
    ("/sop/", NodeCategory::Sop),
    ("/vop/", NodeCategory::Vop),
    ("/chop/", NodeCategory::Chop),
    ("/cop/", NodeCategory::Cop),
    ("/rop/", NodeCategory::Rop),
    ("/lop/", NodeCategory::Lop),
    ("/top/", NodeCategory::Top),
];

/// Infer a node's context from its type identifier and the normalized entry
/// path, first rule wins. Falls back to `SOP`.
pub fn infer_category(node_type: &str, entry_path: &str) -> NodeCategory {
    let ty = node_type.to_lowercase();
    if DOP_TYPE_KEYWORDS.iter().any(|kw| ty.contains(kw)) {
        return NodeCategory::Dop;
    }

    let path = entry_path.to_lowercase();
    for (pattern, category) in PATH_RULES {
        if path.contains(pattern) {
            return category;
        }
    }
    if path.contains("/obj/") {
        return NodeCategory::Obj;
    }

    NodeCategory::Sop
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_keywords_win_over_path() {
        assert_eq!(
            infer_category("pyrosolver::2.0", "/obj/geo1/x"),
            NodeCategory::Dop
        );
        assert_eq!(infer_category("flipsolver", "/sop/x"), NodeCategory::Dop);
        assert_eq!(infer_category("gasresize", "/x"), NodeCategory::Dop);
        assert_eq!(
            infer_category("Vellumsolver", "/x"),
            NodeCategory::Dop,
            "type matching is case-insensitive"
        );
    }

    #[test]
    fn path_segments_map_to_contexts() {
        assert_eq!(infer_category("noise", "/mat/vop/noise1"), NodeCategory::Vop);
        assert_eq!(infer_category("wave", "/ch/chop/wave1"), NodeCategory::Chop);
        assert_eq!(infer_category("comp", "/img/cop/comp1"), NodeCategory::Cop);
        assert_eq!(infer_category("mantra", "/out/rop/mantra1"), NodeCategory::Rop);
        assert_eq!(infer_category("prune", "/stage/lop/prune1"), NodeCategory::Lop);
        assert_eq!(infer_category("ropfetch", "/tasks/top/fetch1"), NodeCategory::Top);
        assert_eq!(infer_category("merge", "/sim/dop/merge1"), NodeCategory::Dop);
        assert_eq!(infer_category("net", "/obj/dopnet1/x"), NodeCategory::Dop);
    }

    #[test]
    fn obj_is_checked_after_specific_contexts() {
        assert_eq!(infer_category("geo", "/obj/geo1"), NodeCategory::Obj);
        assert_eq!(
            infer_category("noise", "/obj/mat/vop/noise1"),
            NodeCategory::Vop
        );
    }

    #[test]
    fn default_is_sop() {
        assert_eq!(infer_category("box", "/somewhere/else"), NodeCategory::Sop);
    }
}
