use std::fmt::Write as _;
use std::path::PathBuf;

use branchver_core::calculate::RuleSummary;
use branchver_core::matching::{self, BranchMatchingRule};
use branchver_core::VersionModifier;
use clap::Args;

use super::{output_dir, write_output};

#[derive(Args, Debug)]
pub struct PresetsArgs {
    /// Output directory (default: docs)
    #[arg(long = "out-dir", default_value = "docs")]
    pub out_dir: PathBuf,
}

/// Write `presets.md`, the rule tables of the built-in strategies.
pub fn cmd_presets(args: PresetsArgs) -> Result<(), String> {
    let out_dir = output_dir(&args.out_dir)?;
    let modifier = VersionModifier::default();

    let flat = matching::main_based_flat_strategy(&modifier).map_err(|e| e.to_string())?;
    let flow = matching::flow_strategy(&modifier).map_err(|e| e.to_string())?;

    let mut doc = String::from("# Branch matching presets\n\n");
    doc.push_str("Rules are tried top to bottom; the first full match wins.\n");
    render_section(&mut doc, "`flat` (main branch `main`)", &flat);
    render_section(&mut doc, "`flow`", &flow);

    write_output(&out_dir.join("presets.md"), doc)
}

fn render_section(doc: &mut String, title: &str, rules: &[BranchMatchingRule]) {
    let _ = write!(
        doc,
        "\n## {title}\n\n| # | Pattern | Target | Label | Bump |\n|---|---|---|---|---|\n"
    );
    for (index, rule) in rules.iter().map(RuleSummary::from).enumerate() {
        let label = if rule.label.is_empty() { "none" } else { &rule.label };
        let _ = writeln!(
            doc,
            "| {} | `{}` | `{}` | `{label}` | {} |",
            index + 1,
            rule.pattern,
            rule.target,
            rule.modifier
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_row_per_rule() {
        let rules = matching::flow_strategy(&VersionModifier::default()).unwrap();
        let mut doc = String::new();
        render_section(&mut doc, "flow", &rules);

        assert_eq!(doc.lines().filter(|l| l.starts_with("| ")).count(), rules.len() + 1);
        assert!(doc.contains("| 2 | `develop` | `main` | `beta` | patch |"));
    }
}
