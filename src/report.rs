use crate::{cli::ReportMode, plan::Plan, resolve::Resolution};

pub fn build_report(run: &Resolution<'_>, plan: &Plan, mode: ReportMode) -> String {
    match mode {
        ReportMode::Off => String::new(),
        ReportMode::Summary => summary(run, plan),
        ReportMode::Full => format!("{}\n{plan:#?}\n", summary(run, plan)),
    }
}

fn summary(run: &Resolution<'_>, plan: &Plan) -> String {
    let reg = run.registry();
    let mut out = String::new();

    out.push_str("svcplan report (summary)\n");
    out.push_str("========================\n");

    let roots: Vec<&str> = run.roots().iter().map(|&id| reg.name(id)).collect();
    out.push_str(&format!("roots: {}\n", roots.join(", ")));

    out.push_str(&format!("\nmodules ({})\n", reg.len()));
    for (id, m) in reg.iter() {
        out.push_str(&format!(
            "  - {} ({}, visits={})\n",
            m.name,
            run.role(id),
            run.visit_count(id)
        ));
    }

    out.push_str(&format!("\ncomponents ({})\n", plan.components.len()));
    for id in run.standalone_modules() {
        let name = reg.name(id);
        let Some(c) = plan.component(name) else {
            continue;
        };

        let folded: Vec<&str> = run
            .folded_members(id)
            .into_iter()
            .map(|d| reg.name(d))
            .collect();

        out.push_str(&format!(
            "  - {} (mem={} dma={} flags={})\n",
            c.name,
            c.memory.len(),
            c.dma.len(),
            c.flags.len()
        ));
        if !folded.is_empty() {
            out.push_str(&format!("      folds: {}\n", folded.join(", ")));
        }
    }

    out
}
