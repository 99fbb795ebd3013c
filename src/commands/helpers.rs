use crate::converge::{self, ConvergeReport, LocalConverger, Plan};
use crate::error::Result;

/// Print one line per instruction; sensitive content is never shown.
pub fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("Nothing to do.");
        return;
    }
    for (index, instruction) in plan.instructions().iter().enumerate() {
        println!("{:>3}. {}", index + 1, instruction);
    }
}

pub fn print_report(report: &ConvergeReport) {
    println!("{}", summary(report));
}

fn summary(report: &ConvergeReport) -> String {
    format!(
        "{} of {} resources updated",
        report.updated_count(),
        report.total()
    )
}

/// Apply `plan` to the local filesystem and print the summary line.
pub fn converge_locally(plan: &Plan) -> Result<ConvergeReport> {
    let report = converge::apply(&mut LocalConverger::new(), plan)?;
    print_report(&report);
    Ok(report)
}
