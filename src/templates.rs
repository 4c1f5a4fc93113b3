use anyhow::{Context as _, Result};
use minijinja::Environment;
use serde_json::json;
use std::{fs, path::PathBuf};

use crate::{config::TemplateEntry, context::ContextEnv, emit::hex, plan::Plan};

#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    pub name: String,
    pub output: PathBuf,
    pub text: String,
}

/// Renders every `[[emit.templates]]` entry against the plan.
pub fn render_templates(
    ctx: &ContextEnv,
    plan: &Plan,
    entries: &[TemplateEntry],
) -> Result<Vec<RenderedTemplate>> {
    let mut out = Vec::with_capacity(entries.len());
    for t in entries {
        out.push(render_one_template(ctx, plan, t)?);
    }
    Ok(out)
}

fn render_one_template(ctx: &ContextEnv, plan: &Plan, t: &TemplateEntry) -> Result<RenderedTemplate> {
    let name = &t.name;

    let source_path = ctx
        .resolve_path(&t.source)
        .with_context(|| format!("templates.{name}: failed to resolve source path: {}", t.source))?;
    let output = ctx
        .resolve_path(&t.output)
        .with_context(|| format!("templates.{name}: failed to resolve output path: {}", t.output))?;

    let source = fs::read_to_string(&source_path).with_context(|| {
        format!(
            "templates.{name}: failed to read template file: {}",
            source_path.display()
        )
    })?;

    let text = render_plan(&source, ctx, plan)
        .with_context(|| format!("templates.{name}: render failed ({})", source_path.display()))?;

    Ok(RenderedTemplate {
        name: name.clone(),
        output,
        text,
    })
}

/// Context passed to MiniJinja:
/// - plan (components with aggregated resources)
/// - flags (deduplicated, component order)
/// - manifest_dir
pub fn render_plan(source: &str, ctx: &ContextEnv, plan: &Plan) -> Result<String> {
    let ctx_json = json!({
        "plan": plan,
        "flags": plan.all_flags(),
        "manifest_dir": ctx.base_dir().to_string_lossy(),
    });
    render_minijinja(source, &ctx_json)
}

fn render_minijinja(source: &str, ctx_json: &serde_json::Value) -> Result<String> {
    let mut env = Environment::new();

    env.add_filter("hex", |v: u64| -> String { hex(v) });

    // Any value to JSON text: strings, region tables, flag lists.
    env.add_filter("tojson", |v: minijinja::Value| -> Result<String, minijinja::Error> {
        serde_json::to_string(&v).map_err(|e| {
            minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string())
        })
    });

    env.add_template("tpl", source)?;
    let tpl = env.get_template("tpl")?;
    let v = minijinja::value::Value::from_serialize(ctx_json);
    Ok(tpl.render(v)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{plan::Component, registry::MemRegion};
    use std::collections::BTreeMap;

    fn plan() -> Plan {
        Plan {
            components: vec![Component {
                name: "blk-thread".into(),
                source: "blk.elf".into(),
                memory: vec![MemRegion { virt: 0x1000, phys: 0x2000, size: 0x100 }],
                dma: vec![],
                flags: vec!["blk_ipc".into()],
            }],
        }
    }

    fn ctx(dir: &std::path::Path) -> ContextEnv {
        ContextEnv::with_vars(BTreeMap::new(), dir.to_path_buf())
    }

    #[test]
    fn renders_components_with_hex_filter() {
        let c = ctx(std::path::Path::new("/work"));
        let src = "{% for c in plan.components %}{{ c.name }}={{ c.memory[0].virt | hex }};{% endfor %}{{ flags | join(',') }}";
        let text = render_plan(src, &c, &plan()).unwrap();
        assert_eq!(text, "blk-thread=0x1000;blk_ipc");
    }

    #[test]
    fn tojson_quotes_strings() {
        let c = ctx(std::path::Path::new("/work"));
        let text = render_plan("{{ plan.components[0].source | tojson }}", &c, &plan()).unwrap();
        assert_eq!(text, "\"blk.elf\"");
    }

    #[test]
    fn tojson_renders_structured_values() {
        let c = ctx(std::path::Path::new("/work"));
        let text = render_plan("{{ flags | tojson }}", &c, &plan()).unwrap();
        assert_eq!(text, "[\"blk_ipc\"]");

        let text = render_plan("{{ plan.components[0].memory | tojson }}", &c, &plan()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v[0]["virt"], 0x1000);
        assert_eq!(v[0]["size"], 0x100);
    }

    #[test]
    fn template_entries_resolve_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.j2"), "{{ plan.components | length }}").unwrap();

        let c = ctx(dir.path());
        let entries = vec![TemplateEntry {
            name: "count".into(),
            source: "t.j2".into(),
            output: "{cwd}/out/count.txt".into(),
        }];
        let rendered = render_templates(&c, &plan(), &entries).unwrap();

        assert_eq!(rendered[0].text, "1");
        assert_eq!(rendered[0].output, dir.path().join("out/count.txt"));
    }

    #[test]
    fn missing_template_names_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![TemplateEntry {
            name: "ghost".into(),
            source: "nope.j2".into(),
            output: "x".into(),
        }];
        let err = render_templates(&ctx(dir.path()), &plan(), &entries).unwrap_err();
        assert!(format!("{err:#}").contains("templates.ghost"));
    }
}
