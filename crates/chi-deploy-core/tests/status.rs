mod support;

use chi_deploy_core::chain::Fault;
use chi_deploy_core::registry::Lifecycle;
use chi_deploy_core::stages::build_plan;
use chi_deploy_core::status::collect_status;

use support::Rehearsal;

#[test]
fn completed_deployment_reports_all_ready() {
    let mut rehearsal = Rehearsal::new();
    rehearsal.run().expect("deployment should succeed");

    let report = collect_status(
        &rehearsal.registry(),
        &rehearsal.network,
        &build_plan(&rehearsal.config),
    )
    .expect("status should collect");

    assert!(report.summary.is_complete());
    assert_eq!(report.summary.total, 27);
    assert!(report.pending_steps.is_empty());
    assert!(report.unplanned.is_empty());
    assert!(report.components.iter().all(|c| c.address.is_some()));
}

#[test]
fn interrupted_run_needs_resolution() {
    let mut rehearsal = Rehearsal::new();
    rehearsal.inject(Fault::on_confirm("CHI.mint"));
    rehearsal.run().expect_err("run should lose the mint receipt");

    let report = collect_status(
        &rehearsal.registry(),
        &rehearsal.network,
        &build_plan(&rehearsal.config),
    )
    .expect("status should collect");

    assert!(report.needs_resolution());
    assert_eq!(report.pending_steps, vec!["IDO/mint:IDO".to_string()]);
    let ido = report
        .components
        .iter()
        .find(|c| c.id == "IDO")
        .expect("IDO should be listed");
    assert_eq!(ido.lifecycle, Lifecycle::Deployed);
    assert_eq!(report.summary.deploying, 0);
    assert!(report.summary.missing > 0);
}
