//! Caption localization: renames export columns using descriptor captions.
//!
//! The join key is the field identifier, matched case-insensitively against
//! the column's current name. Never drops or reorders columns.

use std::collections::HashSet;

use crate::{descriptor::DescriptorMeta, table::TypedTable};

/// Applies descriptor captions to `table`'s column names.
///
/// No-op when `meta` is absent or carries no id-keyed captions. Collisions
/// resolve by suffixing `" (2)"`, `" (3)"`, ... in first-seen order; columns
/// without a caption keep their name and reserve it against later captions.
pub fn apply(mut table: TypedTable, meta: Option<&DescriptorMeta>) -> TypedTable {
    let Some(meta) = meta else {
        return table;
    };
    if !meta.has_column_captions() {
        return table;
    }

    let mut used: HashSet<String> = HashSet::new();
    for column in &mut table.columns {
        match meta.caption_for_id(&column.name) {
            Some(caption) if !caption.trim().is_empty() => {
                column.name = make_unique(caption, &mut used);
            }
            _ => {
                used.insert(column.name.to_lowercase());
            }
        }
    }
    table
}

fn make_unique(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_lowercase()) {
        return base.to_string();
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{base} ({counter})");
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}
