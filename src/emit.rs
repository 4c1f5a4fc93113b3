use anyhow::{Context as _, Result};
use std::{fs, path::Path};

use crate::{
    config::EmitConfig,
    plan::{Component, Plan},
};

/// Renders a [`Plan`] into the build-system fragments the root task and
/// the Makefile include.
#[derive(Debug, Clone)]
pub struct Emitter<'a> {
    table: &'a str,
    item_type: &'a str,
    item_macro: &'a str,
    cfg_prefix: &'a str,
}

impl<'a> Emitter<'a> {
    pub fn new(cfg: &'a EmitConfig) -> Self {
        Self {
            table: &cfg.table,
            item_type: &cfg.item_type,
            item_macro: &cfg.item_macro,
            cfg_prefix: &cfg.cfg_prefix,
        }
    }

    /// `pub const TABLE: &[Type] = &[ service! { .. }, .. ];`
    pub fn rust_table(&self, plan: &Plan) -> String {
        let mut out = String::new();
        self.header(&mut out, "// ");

        out.push_str("pub const ");
        out.push_str(self.table);
        out.push_str(": &[");
        out.push_str(self.item_type);
        out.push_str("] = &[\n");

        for c in plan.components.iter() {
            self.service_item(&mut out, c);
        }

        out.push_str("];\n");
        out
    }

    /// `RUSTFLAGS += --cfg=a --cfg=b`
    pub fn make_flags(&self, plan: &Plan) -> String {
        let mut out = String::new();
        self.header(&mut out, "# ");

        out.push_str("RUSTFLAGS +=");
        for f in plan.all_flags() {
            out.push(' ');
            out.push_str(self.cfg_prefix);
            out.push_str(&f);
        }
        out.push('\n');
        out
    }

    pub fn json(&self, plan: &Plan) -> Result<String> {
        let mut s = serde_json::to_string_pretty(plan).context("failed to serialize plan")?;
        s.push('\n');
        Ok(s)
    }

    fn header(&self, out: &mut String, comment: &str) {
        out.push_str(comment);
        out.push_str("generated by svcplan; do not edit\n");
    }

    fn service_item(&self, out: &mut String, c: &Component) {
        out.push_str("    ");
        out.push_str(self.item_macro);
        out.push_str("! {\n");

        out.push_str("        name: ");
        out.push_str(&quote_rust(&c.name));
        out.push_str(",\n");

        out.push_str("        file: ");
        out.push_str(&quote_rust(&c.source));
        out.push_str(",\n");

        let mem: Vec<String> = c
            .memory
            .iter()
            .map(|m| format!("({}, {}, {})", hex(m.virt), hex(m.phys), hex(m.size)))
            .collect();
        out.push_str("        mem: &[");
        out.push_str(&mem.join(", "));
        out.push_str("],\n");

        let dma: Vec<String> = c
            .dma
            .iter()
            .map(|d| format!("({}, {})", hex(d.addr), hex(d.size)))
            .collect();
        out.push_str("        dma: &[");
        out.push_str(&dma.join(", "));
        out.push_str("],\n");

        out.push_str("    },\n");
    }
}

pub fn hex(v: u64) -> String {
    format!("{v:#x}")
}

fn quote_rust(s: &str) -> String {
    format!("{s:?}")
}

/// Writes `text` to `path` unless the file already holds exactly that.
/// Returns whether the file was touched.
pub fn write_if_changed(path: &Path, text: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == text {
            tracing::debug!(path = %path.display(), "unchanged");
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote");
    Ok(true)
}
