//! The FleetEdge demo fleet.
//!
//! A small, fixed fleet used by the CLI, the doc examples and the tests: four
//! actors, three vehicles, a maintenance log and two cargo manifests, the
//! fleet policy presets, and the scenarios they are expected to decide.

use chrono::{DateTime, Utc};
use fleetedge_abac::{Actor, ActorKind, Outcome, Policy, Resource, ResourceKind};
use fleetedge_rbac::ModuleRegistry;
use fleetedge_types::ActionName;

use crate::api::AuthorizeRequest;
use crate::catalog::ActionCatalog;
use crate::directory::Directory;
use crate::error::Result;

/// Everything needed to stand up an [`Authorizer`](crate::Authorizer).
#[derive(Debug, Clone)]
pub struct FleetFixture {
    pub actors: Vec<Actor>,
    pub resources: Vec<Resource>,
    pub policies: Vec<Policy>,
    pub registry: ModuleRegistry,
    pub catalog: ActionCatalog,
}

impl FleetFixture {
    /// A directory holding the fixture's actors and resources.
    pub fn directory(&self) -> Directory {
        let mut directory = Directory::new();
        for actor in &self.actors {
            directory.add_actor(actor.clone());
        }
        for resource in &self.resources {
            directory.add_resource(resource.clone());
        }
        directory
    }
}

pub fn fleet_demo() -> Result<FleetFixture> {
    let registry = ModuleRegistry::fleet_portal()?;
    let policies = Policy::fleet_policies();

    let mut catalog = ActionCatalog::from_registry(&registry);
    catalog.extend(&ActionCatalog::from_policies(&policies));

    Ok(FleetFixture {
        actors: fleet_actors(),
        resources: fleet_resources(),
        policies,
        registry,
        catalog,
    })
}

fn fleet_actors() -> Vec<Actor> {
    vec![
        Actor::new(
            "svc-allianz",
            ActorKind::ServicePrincipal,
            "Allianz Insurance Partner",
        ),
        Actor::new("svc-routing", ActorKind::ServicePrincipal, "Routing Service"),
        Actor::new("usr-dispatch", ActorKind::HumanUser, "Fleet Dispatcher"),
        Actor::new("usr-mechanic", ActorKind::HumanUser, "Workshop Technician"),
    ]
}

fn fleet_resources() -> Vec<Resource> {
    vec![
        Resource::new("veh-ev-van-12", ResourceKind::Vehicle)
            .with_attribute("status", "On_Route")
            .with_attribute("location", "52.5200,13.4050")
            .with_attribute("mileage", 48_200_i64)
            .with_attribute("onActiveRoute", true)
            .with_attribute("insurancePolicyId", "ALLIANZ-9983-B"),
        Resource::new("veh-tipper-5", ResourceKind::Vehicle)
            .with_attribute("status", "In_Maintenance")
            .with_attribute("location", "Depot North")
            .with_attribute("mileage", 261_400_i64)
            .with_attribute("onActiveRoute", false)
            .with_attribute("insurancePolicyId", "ALLIANZ-9983-B"),
        Resource::new("veh-tipper-8", ResourceKind::Vehicle)
            .with_attribute("status", "Available")
            .with_attribute("location", "Depot South")
            .with_attribute("mileage", 132_900_i64)
            .with_attribute("onActiveRoute", false)
            .with_attribute("insurancePolicyId", "AXA-2210-C"),
        Resource::new("mlog-tipper-5", ResourceKind::MaintenanceLog)
            .with_attribute("vehicleId", "veh-tipper-5"),
        Resource::new("cm-4471", ResourceKind::CargoManifest).with_attribute("cargoType", "hazmat"),
        Resource::new("cm-4472", ResourceKind::CargoManifest).with_attribute("cargoType", "produce"),
    ]
}

/// A request together with the decision the demo fleet should reach.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub request: AuthorizeRequest,
    pub expected: Outcome,
    /// `None` when the default deny decides.
    pub deciding_policy: Option<&'static str>,
}

fn scenario(
    name: &'static str,
    actor: &str,
    action: &'static str,
    resource: &str,
    at: DateTime<Utc>,
    expected: Outcome,
    deciding_policy: Option<&'static str>,
) -> Scenario {
    Scenario {
        name,
        request: AuthorizeRequest::new(actor, ActionName::from_static(action), resource).at(at),
        expected,
        deciding_policy,
    }
}

/// The demo scenarios, all evaluated at `at`.
pub fn fleet_scenarios(at: DateTime<Utc>) -> Vec<Scenario> {
    use Outcome::{Denied, Granted};

    vec![
        scenario(
            "insurer reads telemetry of an insured van on route",
            "svc-allianz",
            "vehicle:read:telemetry",
            "veh-ev-van-12",
            at,
            Granted,
            Some("pol-insurance-telemetry"),
        ),
        scenario(
            "insurer reads telemetry of a parked tipper",
            "svc-allianz",
            "vehicle:read:telemetry",
            "veh-tipper-5",
            at,
            Denied,
            Some("pol-insurance-telemetry"),
        ),
        scenario(
            "routing rebalances a tipper in maintenance",
            "svc-routing",
            "vehicle:update:load_balance",
            "veh-tipper-5",
            at,
            Denied,
            Some("pol-tipper-access"),
        ),
        scenario(
            "routing rebalances an available tipper",
            "svc-routing",
            "vehicle:update:load_balance",
            "veh-tipper-8",
            at,
            Granted,
            Some("pol-tipper-access"),
        ),
        scenario(
            "technician signs a maintenance entry",
            "usr-mechanic",
            "maintenance:write:log",
            "mlog-tipper-5",
            at,
            Granted,
            Some("pol-maintenance-write"),
        ),
        scenario(
            "routing service writes a maintenance entry",
            "svc-routing",
            "maintenance:write:log",
            "mlog-tipper-5",
            at,
            Denied,
            Some("pol-maintenance-write"),
        ),
        scenario(
            "dispatcher edits a hazardous manifest",
            "usr-dispatch",
            "cargo:update:manifest",
            "cm-4471",
            at,
            Denied,
            Some("pol-hazmat-lockdown"),
        ),
        scenario(
            "dispatcher edits a produce manifest",
            "usr-dispatch",
            "cargo:update:manifest",
            "cm-4472",
            at,
            Granted,
            Some("pol-cargo-manifest-edit"),
        ),
        scenario(
            "routing reroutes a tipper past service mileage",
            "svc-routing",
            "vehicle:update:route",
            "veh-tipper-5",
            at,
            Denied,
            Some("pol-high-mileage-hold"),
        ),
        scenario(
            "routing reroutes a van",
            "svc-routing",
            "vehicle:update:route",
            "veh-ev-van-12",
            at,
            Granted,
            Some("pol-route-dispatch"),
        ),
        scenario(
            "routing reads a location no policy covers",
            "svc-routing",
            "vehicle:read:location",
            "veh-ev-van-12",
            at,
            Denied,
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_consistent() {
        let fixture = fleet_demo().unwrap();
        let directory = fixture.directory();
        for scenario in fleet_scenarios(Utc::now()) {
            assert!(directory.actor(&scenario.request.actor).is_ok(), "{}", scenario.name);
            assert!(directory.resource(&scenario.request.resource).is_ok(), "{}", scenario.name);
            assert!(
                fixture.catalog.contains(&scenario.request.action),
                "{}",
                scenario.name
            );
        }
    }

    #[test]
    fn test_location_read_is_known_but_uncovered() {
        let fixture = fleet_demo().unwrap();
        let location = ActionName::from_static("vehicle:read:location");
        assert!(fixture.catalog.contains(&location));
        assert!(fixture.policies.iter().all(|p| !p.applies_to(&location)));
    }
}
