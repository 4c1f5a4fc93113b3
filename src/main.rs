use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;

use svcplan::{
    cli::{Args, ReportMode},
    emit::write_if_changed,
    logging, report, templates, ContextEnv, Emitter, Manifest, Registry, Resolution, Selection,
};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(logging::level_for(args.verbose, args.quiet))?;

    let mut ctx = ContextEnv::new()?;
    let manifest_path = ctx.locate_manifest(args.manifest.as_ref())?;
    let manifest = Manifest::load_from_path(&manifest_path)?;

    let mut roots: Vec<String> = Vec::new();
    if let Some(sel_path) = ctx.locate_selection(args.selection.as_ref())? {
        roots.extend(Selection::load_from_path(&sel_path)?.module_selected);
    }
    roots.extend(args.roots.iter().cloned());

    let registry = Registry::load(manifest.descriptors())
        .with_context(|| format!("failed to load modules from {}", manifest_path.display()))?;
    let run = Resolution::run(&registry, roots.as_slice())?;

    let policy = args.flag_policy.unwrap_or(manifest.plan.flag_policy);
    let plan = run.plan(policy)?;

    tracing::info!(
        modules = registry.len(),
        components = plan.components.len(),
        flag_policy = %policy,
        "planned services"
    );

    if args.report != ReportMode::Off {
        let text = report::build_report(&run, &plan, args.report);
        match args.report_out.as_ref() {
            Some(p) => write_if_changed(p, &text).map(|_| ())?,
            None => eprint!("{text}"),
        }
    }

    let em = Emitter::new(&manifest.emit);
    let mut stdout = String::new();

    if args.json {
        stdout.push_str(&em.json(&plan)?);
    }

    let rust_out = output_path(&ctx, args.rust_out.as_ref(), manifest.emit.rust.as_deref())?;
    let make_out = output_path(&ctx, args.make_out.as_ref(), manifest.emit.make.as_deref())?;
    let rendered = templates::render_templates(&ctx, &plan, &manifest.emit.templates)?;

    // Nothing configured: behave like a filter and print the fragments.
    let to_stdout = args.stdout || (rust_out.is_none() && make_out.is_none());

    let rust_text = em.rust_table(&plan);
    let make_text = em.make_flags(&plan);

    if to_stdout {
        stdout.push_str(&rust_text);
        stdout.push('\n');
        stdout.push_str(&make_text);
        for t in rendered.iter() {
            stdout.push('\n');
            stdout.push_str(&t.text);
            if !t.text.ends_with('\n') {
                stdout.push('\n');
            }
        }
    } else {
        if let Some(p) = rust_out.as_ref() {
            write_if_changed(p, &rust_text)?;
        }
        if let Some(p) = make_out.as_ref() {
            write_if_changed(p, &make_text)?;
        }
        for t in rendered.iter() {
            write_if_changed(&t.output, &t.text)
                .with_context(|| format!("templates.{}: failed to write output", t.name))?;
        }
    }

    print!("{stdout}");
    Ok(())
}

fn output_path(ctx: &ContextEnv, cli: Option<&PathBuf>, configured: Option<&str>) -> Result<Option<PathBuf>> {
    if let Some(p) = cli {
        return Ok(Some(p.clone()));
    }
    configured.map(|raw| ctx.resolve_path(raw)).transpose()
}
