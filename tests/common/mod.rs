#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Descriptor used across the integration tests: an order document with a
/// content table, one fieldset table, and a mix of declared types.
pub const ORDER_DESC: &str = r#"
<form>
  <content table="dc_orders"/>
  <fieldset-def table="fs_lines" caption="Строки заказа"/>
  <field name="DOCID" type="STRING" id="C1" desc="Номер документа"/>
  <field name="AMOUNT" type="DECIMAL" id="C2" desc="Сумма"/>
  <field name="ORDERDATE" type="DATE" id="C3" desc="Дата заказа"/>
  <field name="NOTE" id="C4" desc="Примечание"/>
  <field name="EXTRA" id="C5" desc="Сумма"/>
</form>
"#;
