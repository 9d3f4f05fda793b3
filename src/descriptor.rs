//! Descriptor metadata model and `.desc` XML parsing.
//!
//! A descriptor is the externally supplied schema description for one
//! document type: its content table, auxiliary fieldset tables, table and
//! column captions, and per-field declared types. The XML dialect is loose:
//! element and attribute names match case-insensitively, captions may live
//! in `desc`, `documentation`, or `caption`, and a malformed or empty
//! document simply yields no descriptor.

use std::collections::HashMap;

use log::debug;

/// Declared metadata for a single field, keyed by system name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub system_name: String,
    pub caption: Option<String>,
    pub declared_type: Option<String>,
}

/// Normalized, immutable schema description for one document type.
///
/// All maps are built case-insensitively with first-seen-wins semantics;
/// lookups therefore never depend on descriptor element order beyond the
/// first occurrence of a key.
#[derive(Debug, Clone, Default)]
pub struct DescriptorMeta {
    pub content_table: Option<String>,
    /// Auxiliary table names in descriptor order, deduplicated case-insensitively.
    pub fieldset_tables: Vec<String>,
    table_captions: HashMap<String, String>,
    fields_by_system_name: HashMap<String, FieldMeta>,
    column_captions_by_id: HashMap<String, String>,
}

impl DescriptorMeta {
    /// Caption for a table name, matched case-insensitively.
    pub fn table_caption(&self, table: &str) -> Option<&str> {
        self.table_captions
            .get(&table.to_lowercase())
            .map(String::as_str)
    }

    /// End-user caption for a column, keyed by field id, case-insensitive.
    pub fn caption_for_id(&self, id: &str) -> Option<&str> {
        self.column_captions_by_id
            .get(&id.to_lowercase())
            .map(String::as_str)
    }

    pub fn has_column_captions(&self) -> bool {
        !self.column_captions_by_id.is_empty()
    }

    pub fn field(&self, system_name: &str) -> Option<&FieldMeta> {
        self.fields_by_system_name.get(system_name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields_by_system_name.values()
    }

    /// Resolves the declared type for a column system name.
    ///
    /// Descriptor keys are not always the bare system name: composite keys
    /// such as `FS_S1_LIST:C4` or `forms/C4` appear in the wild, and some
    /// descriptors key a field by id while carrying the system name on the
    /// field itself. Resolution therefore runs four stages, first hit wins:
    ///
    /// 1. exact key match,
    /// 2. case-insensitive key match,
    /// 3. suffix match on `...:<name>` / `.../<name>` composite keys,
    /// 4. match on the field's own `system_name`.
    pub fn declared_type(&self, system_name: &str) -> Option<&str> {
        let wanted = system_name.trim();
        if wanted.is_empty() {
            return None;
        }

        if let Some(found) = self
            .fields_by_system_name
            .get(wanted)
            .and_then(|f| f.declared_type.as_deref())
        {
            return Some(found);
        }

        for (key, field) in &self.fields_by_system_name {
            if key.trim().eq_ignore_ascii_case(wanted) {
                if let Some(declared) = field.declared_type.as_deref() {
                    return Some(declared);
                }
            }
        }

        for (key, field) in &self.fields_by_system_name {
            let key = key.trim();
            if ends_with_ignore_case(key, ':', wanted) || ends_with_ignore_case(key, '/', wanted) {
                if let Some(declared) = field.declared_type.as_deref() {
                    return Some(declared);
                }
            }
        }

        for field in self.fields_by_system_name.values() {
            if field.system_name.trim().eq_ignore_ascii_case(wanted) {
                if let Some(declared) = field.declared_type.as_deref() {
                    return Some(declared);
                }
            }
        }

        None
    }
}

fn ends_with_ignore_case(key: &str, separator: char, name: &str) -> bool {
    let Some(prefix_len) = key.len().checked_sub(name.len() + separator.len_utf8()) else {
        return false;
    };
    key.is_char_boundary(prefix_len)
        && key[prefix_len..].starts_with(separator)
        && key[prefix_len + separator.len_utf8()..].eq_ignore_ascii_case(name)
}

fn attr_ci<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
        .filter(|v| !v.trim().is_empty())
}

fn tag_is(node: roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

/// Parses descriptor XML into a [`DescriptorMeta`].
///
/// Returns `None` for blank or malformed input; a descriptor that cannot be
/// read is treated as absent, never as an error.
pub fn parse_descriptor(xml: &str) -> Option<DescriptorMeta> {
    if xml.trim().is_empty() {
        return None;
    }
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(err) => {
            debug!("Discarding malformed descriptor XML: {err}");
            return None;
        }
    };
    let root = doc.root_element();
    let mut meta = DescriptorMeta::default();

    if let Some(content) = root
        .descendants()
        .find(|n| tag_is(*n, "content"))
        .and_then(|n| attr_ci(n, "table"))
    {
        meta.content_table = Some(content.to_string());
        meta.table_captions
            .entry(content.to_lowercase())
            .or_insert_with(|| "Content".to_string());
    }

    for node in root
        .descendants()
        .filter(|n| tag_is(*n, "fieldset-def") || tag_is(*n, "nested-fieldset"))
    {
        let Some(table) = attr_ci(node, "table") else {
            continue;
        };
        if !meta
            .fieldset_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
        {
            meta.fieldset_tables.push(table.to_string());
        }
        if let Some(caption) = attr_ci(node, "caption").or_else(|| attr_ci(node, "documentation")) {
            meta.table_captions
                .entry(table.to_lowercase())
                .or_insert_with(|| caption.to_string());
        }
    }

    for node in root
        .descendants()
        .filter(|n| tag_is(*n, "field") || tag_is(*n, "column"))
    {
        let caption = attr_ci(node, "desc")
            .or_else(|| attr_ci(node, "documentation"))
            .or_else(|| attr_ci(node, "caption"));

        if let Some(system_name) = attr_ci(node, "name") {
            meta.fields_by_system_name
                .entry(system_name.to_string())
                .or_insert_with(|| FieldMeta {
                    system_name: system_name.to_string(),
                    caption: caption.map(str::to_string),
                    declared_type: attr_ci(node, "type").map(str::to_string),
                });
        }

        if let (Some(id), Some(caption)) = (attr_ci(node, "id"), caption) {
            meta.column_captions_by_id
                .entry(id.to_lowercase())
                .or_insert_with(|| caption.to_string());
        }
    }

    debug!(
        "Parsed descriptor: content={:?}, {} fieldset table(s), {} field(s), {} caption id(s)",
        meta.content_table,
        meta.fieldset_tables.len(),
        meta.fields_by_system_name.len(),
        meta.column_captions_by_id.len()
    );
    Some(meta)
}
