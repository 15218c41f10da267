//! Scripted end-to-end flows

use crate::error::{CliError, CliResult};
use crate::output::{print_json, OutputFormat};
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use tumen_runtime::{AppointmentReport, Hierarchy, HierarchyConfig, Simulation};
use tumen_types::{MemberId, Tier, VerificationProgress};

/// Simulation subcommands
#[derive(Subcommand, Debug)]
pub enum SimulateCommands {
    /// Found one Base unit: ten members join and co-sign its leader
    Base {
        /// Unit id
        #[arg(short, long, default_value = "arban-1")]
        unit: String,
    },

    /// Build a Mid unit from ten founded Base units and appoint its leader
    Mid {
        /// Unit id
        #[arg(short, long, default_value = "zun-1")]
        unit: String,
    },

    /// Build a full Top unit of 10,000 members and appoint its leader
    TopAppointment {
        /// Unit id
        #[arg(short, long, default_value = "tumen-1")]
        unit: String,
    },

    /// Verify a member by peer attestation inside one Mid unit
    Verification {
        /// Mid unit id
        #[arg(short, long, default_value = "zun-1")]
        unit: String,
    },
}

/// What a scenario left behind
#[derive(Debug, Serialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Appointment {
        report: AppointmentReport,
        events: usize,
        state_hash: String,
    },
    Verification {
        member: MemberId,
        progress: VerificationProgress,
        chain: Vec<MemberId>,
        events: usize,
    },
}

const NOTARY: &str = "cli-notary";

/// Execute a simulation command
pub fn execute(
    command: SimulateCommands,
    config: HierarchyConfig,
    format: OutputFormat,
) -> CliResult<()> {
    let outcome = run_scenario(command, config)?;
    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Text => {
            print_summary(&outcome);
            Ok(())
        }
    }
}

/// Run a scenario against a fresh in-memory hierarchy
pub fn run_scenario(
    command: SimulateCommands,
    config: HierarchyConfig,
) -> CliResult<ScenarioOutcome> {
    let hierarchy = Hierarchy::new(config)?;
    let sim = Simulation::new(&hierarchy, MemberId::new(NOTARY))?;
    match command {
        SimulateCommands::Base { unit } => {
            let report = sim.found_base_unit(&unit)?;
            appointment(&hierarchy, report)
        }
        SimulateCommands::Mid { unit } => {
            let report = sim.build_unit(Tier::Mid, &unit)?;
            appointment(&hierarchy, report)
        }
        SimulateCommands::TopAppointment { unit } => {
            let report = sim.build_unit(Tier::Top, &unit)?;
            appointment(&hierarchy, report)
        }
        SimulateCommands::Verification { unit } => verification(&hierarchy, &sim, &unit),
    }
}

fn appointment(hierarchy: &Hierarchy, report: AppointmentReport) -> CliResult<ScenarioOutcome> {
    let state_hash = hierarchy
        .snapshot()?
        .content_hash()
        .map_err(tumen_types::HierarchyError::from)?;
    Ok(ScenarioOutcome::Appointment {
        report,
        events: hierarchy.event_log().len(),
        state_hash,
    })
}

/// Seat 1 of the first Base unit is verified by the leaders of the next
/// units, each of whom an authority vouched for first
fn verification(
    hierarchy: &Hierarchy,
    sim: &Simulation<'_>,
    unit: &str,
) -> CliResult<ScenarioOutcome> {
    let config = &hierarchy.config().verification;
    let threshold = config.peer_threshold as usize;
    if threshold >= 10 {
        return Err(CliError::InvalidArgument(format!(
            "peer threshold {} needs more than one Mid unit",
            threshold
        )));
    }
    let authority = hierarchy
        .authorities()?
        .into_iter()
        .next()
        .ok_or_else(|| CliError::InvalidArgument("no authorities configured".into()))?;

    sim.build_unit(Tier::Mid, unit)?;
    let member = Simulation::member_id(&format!("{}.0", unit), 1);
    for i in 1..=threshold {
        let peer = Simulation::member_id(&format!("{}.{}", unit, i), 0);
        hierarchy.submit_super_verification(&authority, &peer, "simulation seed")?;
    }

    hierarchy.request_verification(&member)?;
    let mut progress = hierarchy.get_verification_status(&member)?;
    for i in 1..=threshold {
        let peer = Simulation::member_id(&format!("{}.{}", unit, i), 0);
        progress = hierarchy.submit_peer_verification(&peer, &member)?;
    }

    Ok(ScenarioOutcome::Verification {
        chain: hierarchy.verification_chain(&member)?,
        member,
        progress,
        events: hierarchy.event_log().len(),
    })
}

fn print_summary(outcome: &ScenarioOutcome) {
    match outcome {
        ScenarioOutcome::Appointment {
            report,
            events,
            state_hash,
        } => {
            println!(
                "{} {} ({}) complete={} population={}",
                "✓".green(),
                report.unit.id.to_string().bold(),
                report.unit.tier,
                report.unit.complete,
                report.population
            );
            match &report.unit.leader {
                Some(leader) => println!("  leader: {}", leader),
                None => println!("  leader: {}", "none".dimmed()),
            }
            println!(
                "  document {} {:?} with {}/{} signatures",
                report.document.id,
                report.document.status,
                report.document.signature_count(),
                report.document.threshold
            );
            println!("  events: {}", events);
            println!("  state: {}", state_hash.dimmed());
        }
        ScenarioOutcome::Verification {
            member,
            progress,
            chain,
            events,
        } => {
            let mark = if progress.verified {
                "✓".green()
            } else {
                "✗".red()
            };
            println!(
                "{} {} {} ({}/{} peer attestations)",
                mark,
                member.to_string().bold(),
                progress.state,
                progress.count,
                progress.threshold
            );
            let chain: Vec<String> = chain.iter().map(|m| m.to_string()).collect();
            println!("  chain: {}", chain.join(" <- "));
            println!("  events: {}", events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumen_types::{DocumentStatus, TrustState};

    #[test]
    fn test_base_scenario() {
        let outcome = run_scenario(
            SimulateCommands::Base {
                unit: "arban-7".into(),
            },
            HierarchyConfig::default(),
        )
        .unwrap();

        match outcome {
            ScenarioOutcome::Appointment { report, events, .. } => {
                assert_eq!(report.population, 10);
                assert_eq!(report.document.status, DocumentStatus::Finalized);
                assert_eq!(report.unit.leader, Some(MemberId::new("arban-7-m0")));
                assert!(events > 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_mid_scenario() {
        let outcome = run_scenario(
            SimulateCommands::Mid {
                unit: "zun-3".into(),
            },
            HierarchyConfig::default(),
        )
        .unwrap();

        match outcome {
            ScenarioOutcome::Appointment { report, .. } => {
                assert_eq!(report.population, 100);
                assert!(report.unit.complete);
                assert_eq!(report.unit.leader, Some(MemberId::new("zun-3.0-m0")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_verification_scenario() {
        let outcome = run_scenario(
            SimulateCommands::Verification {
                unit: "zun-1".into(),
            },
            HierarchyConfig::default(),
        )
        .unwrap();

        match outcome {
            ScenarioOutcome::Verification {
                member,
                progress,
                chain,
                ..
            } => {
                assert_eq!(member, MemberId::new("zun-1.0-m1"));
                assert!(progress.verified);
                assert_eq!(progress.state, TrustState::Verified);
                assert_eq!(progress.count, 3);
                assert_eq!(chain.last(), Some(&MemberId::new("FOUNDER-001")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_verification_rejects_large_threshold() {
        let mut config = HierarchyConfig::default();
        config.verification.peer_threshold = 12;
        let result = run_scenario(
            SimulateCommands::Verification {
                unit: "zun-1".into(),
            },
            config,
        );
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = run_scenario(
            SimulateCommands::Base {
                unit: "arban-1".into(),
            },
            HierarchyConfig::default(),
        )
        .unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["scenario"], "appointment");
        assert_eq!(json["report"]["population"], 10);
        assert_eq!(json["state_hash"].as_str().unwrap().len(), 64);
    }
}
