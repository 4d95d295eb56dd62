//! Live Azure module suite.
//!
//! Every test here creates real resources and is ignored by default. The
//! location comes from `AZURE_LOCATION` (default `eastus`) and is passed to
//! each module as the `location` variable.
//!
//! ```bash
//! ARM_TENANT_ID=... cargo test --test azure -- --ignored
//! SKIP_AKS_TESTS=true cargo test --test azure -- --ignored
//! ```

mod common;

use common::{live_case, live_harness};
use infratest::suite::{COSTLY_OPT_IN, Precondition, Provider, TestCase};
use infratest::{Deployment, Harness, HarnessConfig, RunOptions, Value};
use regex::Regex;
use std::env;

const AZURE: Provider = Provider::Azure;

fn azure_opts(config: &HarnessConfig, module: &str, project: &str) -> RunOptions {
    RunOptions::new(AZURE.module(config, module))
        .envs(AZURE.tool_env(config))
        .var("project", project)
        .var("environment", "dev")
}

/// Resource group every other module is placed in.
fn resource_group(harness: &Harness, config: &HarnessConfig, case: &TestCase) -> Deployment {
    harness.deploy(
        azure_opts(config, "resource-group", &case.project("test"))
            .var("location", AZURE.region(config)),
    )
}

fn tenant_id() -> String {
    env::var("ARM_TENANT_ID").unwrap_or_default()
}

#[test]
#[ignore = "provisions real Azure resources"]
fn resource_group_outputs() {
    let mut case = live_case("resource_group_outputs");
    if case.skip_if(&[Precondition::SkipWhenSet("SKIP_RG_TESTS")]) {
        return;
    }
    let (config, harness) = live_harness();
    let project = format!("test{}", case.uid());

    let rg = harness
        .try_deploy(
            azure_opts(&config, "resource-group", &project)
                .var("location", AZURE.region(&config))
                .var("tags", Value::map([("ManagedBy", "terratest")])),
        )
        .unwrap_or_else(|failure| panic!("apply failed for azure/resource-group module: {failure}"));

    let name = rg.output("name");
    assert!(name.contains(&project), "resource group name {name} should contain {project}");
    assert!(!rg.output("location").is_empty());
    let id = rg.output("id");
    assert!(id.starts_with("/subscriptions/"), "unexpected id {id}");
    assert!(id.contains("resourceGroups"), "unexpected id {id}");
}

#[test]
#[ignore = "provisions real Azure resources"]
fn vnet_happy_path() {
    let case = live_case("vnet_happy_path");
    let (config, harness) = live_harness();
    let project = case.project("test");

    let rg = resource_group(&harness, &config, &case);
    let rg_name = rg.output("name");
    assert!(!rg_name.is_empty());

    let vnet = harness.deploy(
        azure_opts(&config, "vnet", &project)
            .var("resource_group_name", rg_name)
            .var("location", AZURE.region(&config))
            .var("address_space", Value::list(["10.50.0.0/16"]))
            .var(
                "subnets",
                Value::map([(
                    "app",
                    Value::map([("address_prefixes", Value::list(["10.50.1.0/24"]))]),
                )]),
            ),
    );

    assert!(!vnet.output("vnet_id").is_empty());
    assert_eq!(vnet.output("vnet_name"), format!("vnet-{project}-dev"));

    let subnet_ids = vnet.output_map("subnet_ids");
    assert_eq!(subnet_ids.len(), 1, "expected 1 subnet");
    assert!(subnet_ids.get("app").is_some_and(|id| !id.is_empty()));

    let nsg_ids = vnet.output_map("nsg_ids");
    assert_eq!(nsg_ids.len(), 1, "expected 1 NSG");
    assert!(nsg_ids.get("app").is_some_and(|id| !id.is_empty()));
}

#[test]
#[ignore = "provisions real Azure resources"]
fn vnet_egress_deny_rule() {
    let case = live_case("vnet_egress_deny_rule");
    let (config, harness) = live_harness();

    let rg = resource_group(&harness, &config, &case);
    let vnet = harness.deploy(
        azure_opts(&config, "vnet", &case.project("test"))
            .var("resource_group_name", rg.output("name"))
            .var("location", AZURE.region(&config))
            .var("address_space", Value::list(["10.60.0.0/16"]))
            .var(
                "subnets",
                Value::map([(
                    "restricted",
                    Value::map([
                        ("address_prefixes", Value::list(["10.60.1.0/24"])),
                        ("deny_outbound_internet", Value::from(true)),
                    ]),
                )]),
            ),
    );

    let nsg_ids = vnet.output_map("nsg_ids");
    assert!(
        nsg_ids.get("restricted").is_some_and(|id| !id.is_empty()),
        "restricted subnet NSG should have been created"
    );
}

#[test]
#[ignore = "provisions an AKS cluster (~10 minutes)"]
fn aks_smoke_test() {
    let mut case = live_case("aks_smoke_test");
    if case.skip_if(&[Precondition::SkipWhenTrue("SKIP_AKS_TESTS")]) {
        return;
    }
    let (config, harness) = live_harness();
    let project = case.project("test");
    let location = AZURE.region(&config).to_string();

    let rg = resource_group(&harness, &config, &case);
    let rg_name = rg.output("name");

    let vnet = harness.deploy(
        azure_opts(&config, "vnet", &project)
            .var("resource_group_name", rg_name.as_str())
            .var("location", location.as_str())
            .var("address_space", Value::list(["10.60.0.0/16"]))
            .var(
                "subnets",
                Value::map([(
                    "aks-system",
                    Value::map([("address_prefixes", Value::list(["10.60.1.0/24"]))]),
                )]),
            ),
    );
    let system_subnet = vnet
        .output_map("subnet_ids")
        .remove("aks-system")
        .unwrap_or_default();
    assert!(!system_subnet.is_empty(), "aks-system subnet should have an ID");

    let aks = harness.deploy(
        azure_opts(&config, "aks", &project)
            .var("resource_group_name", rg_name)
            .var("location", location)
            .var("system_node_pool_subnet_id", system_subnet)
            .var("system_node_pool_vm_size", "Standard_D2s_v3")
            .var("system_node_pool_node_count", 1)
            .var("system_node_pool_min_count", 1)
            .var("system_node_pool_max_count", 2),
    );

    assert_eq!(aks.output("cluster_name"), format!("aks-{project}-dev"));
    assert!(!aks.output("cluster_id").is_empty());
    assert_eq!(
        aks.output("oidc_issuer_url"),
        "",
        "oidc_issuer_url should be empty when workload identity is disabled"
    );
    assert!(
        !aks.output("kubelet_identity_object_id").is_empty(),
        "kubelet identity is needed for ACR pull role assignments"
    );
    assert!(
        aks.output_map("user_node_pool_ids").is_empty(),
        "user_node_pool_ids should be empty without user pools"
    );
}

#[test]
#[ignore = "provisions real Azure resources"]
fn container_registry_smoke_test() {
    let mut case = live_case("container_registry_smoke_test");
    if case.skip_if(&[
        Precondition::SkipWhenTrue("SKIP_ACR_TESTS"),
        Precondition::RequireEnv("ARM_TENANT_ID"),
    ]) {
        return;
    }
    let (config, harness) = live_harness();
    // Registry names are alphanumeric only.
    let project = format!("test{}", case.uid());

    let rg = resource_group(&harness, &config, &case);
    let acr = harness.deploy(
        azure_opts(&config, "container-registry", &project)
            .var("resource_group_name", rg.output("name"))
            .var("location", AZURE.region(&config))
            .var("sku", "Basic"),
    );

    let registry_id = acr.output("registry_id");
    assert!(
        registry_id.contains("/Microsoft.ContainerRegistry/registries/"),
        "unexpected registry_id {registry_id}"
    );
    let login_server = acr.output("login_server");
    assert!(login_server.ends_with(".azurecr.io"), "got {login_server}");

    let registry_name = acr.output("registry_name");
    let alphanumeric = Regex::new("^[a-zA-Z0-9]+$").expect("valid regex");
    assert!(
        alphanumeric.is_match(&registry_name),
        "registry_name should be alphanumeric, got {registry_name}"
    );
}

#[test]
#[ignore = "provisions real Azure resources"]
fn key_vault_smoke_test() {
    let mut case = live_case("key_vault_smoke_test");
    if case.skip_if(&[
        Precondition::SkipWhenSet("SKIP_KEYVAULT_TESTS"),
        Precondition::RequireEnv("ARM_TENANT_ID"),
    ]) {
        return;
    }
    let (config, harness) = live_harness();
    let project = case.project("test");
    let location = AZURE.region(&config).to_string();

    let rg = harness.deploy(
        azure_opts(&config, "resource-group", &project)
            .var("location", location.as_str())
            .no_color(true),
    );
    let rg_name = rg.output("name");
    assert!(!rg_name.is_empty());

    let kv = harness.deploy(
        azure_opts(&config, "key-vault", &project)
            .var("resource_group_name", rg_name)
            .var("location", location)
            .var("tenant_id", tenant_id())
            .var("sku_name", "standard")
            .var("soft_delete_retention_days", 7)
            // Purge protection would block destroy.
            .var("purge_protection_enabled", false)
            .var("network_acls_default_action", "Allow")
            .no_color(true),
    );

    assert!(!kv.output("id").is_empty());
    assert!(!kv.output("name").is_empty());
    let vault_uri = kv.output("vault_uri");
    assert!(vault_uri.starts_with("https://"), "got {vault_uri}");
}

#[test]
#[ignore = "provisions real Azure resources"]
fn monitoring_alert_outputs() {
    let mut case = live_case("monitoring_alert_outputs");
    if case.skip_if(&[
        Precondition::SkipWhenSet("SKIP_AZURE_MONITORING_TESTS"),
        Precondition::RequireEnv("AZURE_AKS_CLUSTER_ID"),
    ]) {
        return;
    }
    let (config, harness) = live_harness();
    let location = AZURE.region(&config).to_string();
    let aks_cluster_id = env::var("AZURE_AKS_CLUSTER_ID").unwrap_or_default();

    let rg = harness
        .try_deploy(
            azure_opts(&config, "resource-group", &case.project("test"))
                .var("location", location.as_str()),
        )
        .unwrap_or_else(|failure| panic!("apply failed for resource-group module: {failure}"));

    let monitoring = harness
        .try_deploy(
            azure_opts(&config, "monitoring", &format!("test{}", case.uid()))
                .var("resource_group_name", rg.output("name"))
                .var("location", location)
                .var("aks_cluster_id", aks_cluster_id)
                .var("cpu_threshold_percent", 85)
                .var("memory_threshold_percent", 85),
        )
        .unwrap_or_else(|failure| panic!("apply failed for azure/monitoring module: {failure}"));

    for output in ["cpu_alert_id", "memory_alert_id"] {
        let id = monitoring.output(output);
        assert!(id.contains("/metricalerts/"), "{output} = {id}");
    }
}

#[test]
#[ignore = "provisions real Azure resources"]
fn private_dns_smoke_test() {
    let mut case = live_case("private_dns_smoke_test");
    if case.skip_if(&[
        Precondition::SkipWhenTrue("SKIP_PRIVATE_DNS_TESTS"),
        Precondition::RequireEnv("ARM_TENANT_ID"),
    ]) {
        return;
    }
    let (config, harness) = live_harness();
    let project = case.project("test");
    let location = AZURE.region(&config).to_string();

    let rg = resource_group(&harness, &config, &case);
    let rg_name = rg.output("name");

    let vnet = harness.deploy(
        azure_opts(&config, "vnet", &project)
            .var("resource_group_name", rg_name.as_str())
            .var("location", location)
            .var("address_space", Value::list(["10.100.0.0/16"]))
            .var("subnets", Value::empty_map()),
    );
    let vnet_id = vnet.output("vnet_id");
    assert!(!vnet_id.is_empty());

    let dns = harness.deploy(
        azure_opts(&config, "private-dns", &project)
            .var("resource_group_name", rg_name)
            .var("zone_name", format!("test{}.internal", case.uid()))
            .var("vnet_links", Value::map([("main-vnet", vnet_id)])),
    );

    let zone_id = dns.output("zone_id");
    assert!(zone_id.contains("/privateDnsZones/"), "unexpected zone_id {zone_id}");
    let zone_name = dns.output("zone_name");
    assert!(zone_name.ends_with(".internal"), "got {zone_name}");

    let links = dns.output_map("vnet_link_ids");
    assert_eq!(links.len(), 1, "expected 1 vnet link");
    let link = links.get("main-vnet").expect("main-vnet link");
    assert!(link.contains("/virtualNetworkLinks/"), "unexpected link {link}");
}

fn front_door_skipped(case: &mut TestCase) -> bool {
    case.skip_if(&[
        Precondition::SkipWhenSet("SKIP_AZURE_TESTS"),
        Precondition::RequireOptIn(COSTLY_OPT_IN),
    ])
}

#[test]
#[ignore = "creates a Front Door profile (billed)"]
fn front_door_outputs() {
    let mut case = live_case("front_door_outputs");
    if front_door_skipped(&mut case) {
        return;
    }
    let (config, harness) = live_harness();
    let project = format!("test{}", case.uid());

    let front_door = harness
        .try_deploy(
            azure_opts(&config, "front-door", &project)
                .var("resource_group_name", "test-rg")
                .var("sku_name", "Standard_AzureFrontDoor")
                .var(
                    "origins",
                    Value::map([(
                        "primary",
                        Value::map([
                            ("host_name", Value::from("example.azurewebsites.net")),
                            ("priority", Value::from(1)),
                            ("weight", Value::from(100)),
                        ]),
                    )]),
                )
                .var(
                    "routes",
                    Value::map([(
                        "default",
                        Value::map([
                            ("patterns_to_match", Value::list(["/*"])),
                            ("supported_protocols", Value::list(["Http", "Https"])),
                        ]),
                    )]),
                ),
        )
        .unwrap_or_else(|failure| panic!("apply failed for azure/front-door module: {failure}"));

    assert!(front_door.output("profile_id").contains("frontdoorprofiles"));
    assert!(front_door.output("profile_name").contains(&project));
    assert!(front_door.output("endpoint_hostname").contains("azurefd.net"));
    assert!(!front_door.output("endpoint_id").is_empty());
    assert!(front_door.output("origin_group_id").contains("originGroups"));
}

#[test]
#[ignore = "creates a Front Door profile (billed)"]
fn front_door_minimal() {
    let mut case = live_case("front_door_minimal");
    if front_door_skipped(&mut case) {
        return;
    }
    let (config, harness) = live_harness();

    let front_door = harness
        .try_deploy(
            azure_opts(&config, "front-door", &format!("test{}", case.uid()))
                .var("resource_group_name", "test-rg"),
        )
        .unwrap_or_else(|failure| panic!("minimal front-door config should apply: {failure}"));
    assert!(!front_door.output("profile_id").is_empty());
}
