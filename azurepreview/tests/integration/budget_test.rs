//! Integration tests for the budget resource

use crate::{object, provider_data, strings};
use azurepreview::AzurePreviewProvider;
use mockito::{Matcher, Server};
use tfplug::context::Context;
use tfplug::provider::Provider;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, ReadResourceRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use tfplug::types::{has_errors, AttributePath, ClientCapabilities, Dynamic, DynamicValue};

const BUDGET_PATH: &str =
    "/subscriptions/sub-1/resourceGroups/rg1/providers/Microsoft.Consumption/budgets/monthly";

fn budget_config(amount: f64, meter: &str, start_date: &str) -> DynamicValue {
    DynamicValue::new(object(vec![
        ("scope", "/subscriptions/sub-1/resourceGroups/rg1".into()),
        ("name", "monthly".into()),
        ("category", "Cost".into()),
        ("amount", Dynamic::Number(amount)),
        ("time_grain", "BillingMonth".into()),
        (
            "time_period",
            Dynamic::List(vec![object(vec![
                ("start_date", start_date.into()),
                ("end_date", "2035-06-01T00:00:00Z".into()),
            ])]),
        ),
        (
            "filters",
            Dynamic::List(vec![object(vec![
                ("resource_groups", strings(&["rg1"])),
                ("meters", strings(&[meter])),
                (
                    "tag",
                    Dynamic::List(vec![object(vec![
                        ("name", "env".into()),
                        ("values", strings(&["prod", "dev"])),
                    ])]),
                ),
            ])]),
        ),
        (
            "notification",
            Dynamic::List(vec![object(vec![
                ("name", "n1".into()),
                ("operator", "GreaterThan".into()),
                ("threshold", Dynamic::Number(80.0)),
                ("contact_roles", strings(&["Contributor"])),
            ])]),
        ),
    ]))
}

fn budget_response(amount: u32) -> String {
    format!(
        r#"{{
            "id": "{path}",
            "name": "monthly",
            "type": "Microsoft.Consumption/budgets",
            "eTag": "\"1d34d016a593709\"",
            "properties": {{
                "category": "Cost",
                "amount": {amount},
                "timeGrain": "BillingMonth",
                "timePeriod": {{"startDate": "2017-06-01T00:00:00Z", "endDate": "2035-06-01T00:00:00Z"}},
                "filters": {{
                    "resourceGroups": ["rg1"],
                    "meters": ["00000000-0000-0000-0000-0000000000aa"],
                    "tags": {{"env": ["prod", "dev"]}}
                }},
                "currentSpend": {{"amount": 12.5, "unit": "USD"}},
                "notifications": {{
                    "n1": {{
                        "enabled": true,
                        "operator": "GreaterThan",
                        "threshold": 80.7,
                        "contactEmails": [],
                        "contactRoles": ["Contributor"],
                        "contactGroups": []
                    }}
                }}
            }}
        }}"#,
        path = BUDGET_PATH,
        amount = amount
    )
}

async fn budget_resource(url: &str) -> Box<dyn ResourceWithConfigure> {
    let provider = AzurePreviewProvider::new();
    let factories = provider.resources();
    let mut resource = factories.get("azurepreview_budget").unwrap()();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(provider_data(url)),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

#[tokio::test(flavor = "multi_thread")]
async fn budget_create_then_read() {
    let mut server = Server::new_async().await;
    let put = server
        .mock("PUT", BUDGET_PATH)
        .match_query(Matcher::UrlEncoded("api-version".into(), "2019-01-01".into()))
        .match_header("authorization", "Bearer integration-token")
        .match_body(Matcher::PartialJsonString(
            r#"{"properties":{"filters":{"meters":["00000000-0000-0000-0000-0000000000aa"],"tags":{"env":["prod","dev"]}},"notifications":{"n1":{"operator":"GreaterThan","threshold":80.0,"contactRoles":["Contributor"]}}}}"#
                .to_string(),
        ))
        .with_status(201)
        .with_body(budget_response(1000))
        .expect(1)
        .create_async()
        .await;
    let get = server
        .mock("GET", BUDGET_PATH)
        .match_query(Matcher::UrlEncoded("api-version".into(), "2019-01-01".into()))
        .with_body(budget_response(1000))
        .expect(2)
        .create_async()
        .await;

    let resource = budget_resource(&server.url()).await;
    let config = budget_config(1000.0, "00000000-0000-0000-0000-0000000000aa", "2017-06-01T00:00:00Z");

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "azurepreview_budget".to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);

    let id = created
        .new_state
        .get_string(&AttributePath::new("id"))
        .unwrap();
    assert!(id.contains("/providers/Microsoft.Consumption/budgets"));

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "azurepreview_budget".to_string(),
                current_state: created.new_state,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(read.diagnostics.is_empty());

    let state = read.new_state.unwrap();
    assert_eq!(state.get_number(&AttributePath::new("amount")).unwrap(), 1000.0);
    assert_eq!(state.get_string(&AttributePath::new("category")).unwrap(), "Cost");
    assert_eq!(
        state.get_string(&AttributePath::new("scope")).unwrap(),
        "/subscriptions/sub-1/resourceGroups/rg1"
    );

    let notifications = state.get_list(&AttributePath::new("notification")).unwrap();
    assert_eq!(notifications.len(), 1);
    let n1 = notifications[0].as_map().unwrap();
    assert_eq!(n1["name"], Dynamic::from("n1"));
    assert_eq!(n1["threshold"], Dynamic::Number(80.0));
    assert_eq!(n1["enabled"], Dynamic::Bool(true));

    let tag_values = state
        .get_list(
            &AttributePath::new("filters")
                .index(0)
                .attribute("tag")
                .index(0)
                .attribute("values"),
        )
        .unwrap();
    assert_eq!(tag_values, vec![Dynamic::from("prod"), Dynamic::from("dev")]);

    put.assert_async().await;
    get.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn budget_update_resends_whole_budget() {
    let mut server = Server::new_async().await;
    let put = server
        .mock("PUT", BUDGET_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJsonString(
            r#"{"properties":{"amount":2000.0,"category":"Cost","timeGrain":"BillingMonth","timePeriod":{"startDate":"2017-06-01T00:00:00Z","endDate":"2035-06-01T00:00:00Z"}}}"#
                .to_string(),
        ))
        .with_body(budget_response(2000))
        .expect(1)
        .create_async()
        .await;
    let _get = server
        .mock("GET", BUDGET_PATH)
        .match_query(Matcher::Any)
        .with_body(budget_response(2000))
        .create_async()
        .await;

    let resource = budget_resource(&server.url()).await;
    let mut prior = budget_config(1000.0, "00000000-0000-0000-0000-0000000000aa", "2017-06-01T00:00:00Z");
    prior
        .set_string(&AttributePath::new("id"), BUDGET_PATH.to_string())
        .unwrap();
    let mut planned = budget_config(2000.0, "00000000-0000-0000-0000-0000000000aa", "2017-06-01T00:00:00Z");
    planned
        .set_string(&AttributePath::new("id"), BUDGET_PATH.to_string())
        .unwrap();

    let updated = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "azurepreview_budget".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    assert_eq!(
        updated
            .new_state
            .get_number(&AttributePath::new("amount"))
            .unwrap(),
        2000.0
    );
    put.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_input_never_reaches_the_api() {
    let mut server = Server::new_async().await;
    let any = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let resource = budget_resource(&server.url()).await;

    for config in [
        budget_config(1000.0, "not-a-guid", "2017-06-01T00:00:00Z"),
        budget_config(1000.0, "00000000-0000-0000-0000-0000000000aa", "June 1st"),
    ] {
        let validated = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "azurepreview_budget".to_string(),
                    config: config.clone(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert!(has_errors(&validated.diagnostics));

        let created = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "azurepreview_budget".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;
        assert!(has_errors(&created.diagnostics));
        assert_eq!(created.diagnostics[0].summary, "Invalid configuration");
    }

    any.assert_async().await;
}
