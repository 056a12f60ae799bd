//! Integration tests for the subscription resource

use crate::{provider_data, strings};
use azurepreview::resources::SubscriptionModel;
use azurepreview::AzurePreviewProvider;
use mockito::{Matcher, Server};
use std::collections::HashMap;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::provider::Provider;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest, ReadResourceRequest,
    ResourceWithConfigure, UpdateResourceRequest,
};
use tfplug::types::{AttributePath, ClientCapabilities, DynamicValue};

const GUID: &str = "6c0a55a4-0b3e-4a0f-9d1e-8a35f7c2f0de";
const CREATE_PATH: &str = "/providers/Microsoft.Billing/enrollmentAccounts/ea-42/providers/Microsoft.Subscription/createSubscription";

fn subscription_json(name: &str) -> String {
    format!(
        r#"{{"id":"/subscriptions/{guid}","subscriptionId":"{guid}","displayName":"{name}","tenantId":"tenant-9","state":"Enabled"}}"#,
        guid = GUID,
        name = name
    )
}

fn config() -> DynamicValue {
    let mut config = SubscriptionModel {
        name: Some("team-dev".to_string()),
        enrollment_account: Some("ea-42".to_string()),
        offer_type: Some("MS-AZR-0148P".to_string()),
        additional_parameters: Some(HashMap::from([(
            "costCenter".to_string(),
            "1234".to_string(),
        )])),
        ..Default::default()
    }
    .to_dynamic();
    config
        .set(&AttributePath::new("owners"), strings(&["owner-a", "owner-b"]))
        .unwrap();
    config
}

async fn subscription_resource(url: &str) -> Box<dyn ResourceWithConfigure> {
    let provider = AzurePreviewProvider::new();
    let mut resource = provider.resources()["azurepreview_subscription"]();
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
async fn subscription_lifecycle() {
    let mut server = Server::new_async().await;
    let status_url = format!("{}/operations/create-1/status", server.url());
    let result_url = format!("{}/operations/create-1/result", server.url());

    let create = server
        .mock("POST", CREATE_PATH)
        .match_query(Matcher::UrlEncoded(
            "api-version".into(),
            "2019-10-01-preview".into(),
        ))
        .match_body(Matcher::JsonString(
            r#"{"displayName":"team-dev","owners":[{"objectId":"owner-a"},{"objectId":"owner-b"}],"offerType":"MS-AZR-0148P","additionalParameters":{"costCenter":"1234"}}"#
                .to_string(),
        ))
        .with_status(202)
        .with_header("Azure-AsyncOperation", &status_url)
        .with_header("Location", &result_url)
        .with_header("Retry-After", "0")
        .expect(1)
        .create_async()
        .await;
    let status = server
        .mock("GET", "/operations/create-1/status")
        .with_body(r#"{"status":"Succeeded"}"#)
        .expect(1)
        .create_async()
        .await;
    let result = server
        .mock("GET", "/operations/create-1/result")
        .with_body(format!(r#"{{"subscriptionLink":"/subscriptions/{}"}}"#, GUID))
        .expect(1)
        .create_async()
        .await;
    let _get = server
        .mock("GET", format!("/subscriptions/{}", GUID).as_str())
        .match_query(Matcher::UrlEncoded("api-version".into(), "2019-11-01".into()))
        .with_body(subscription_json("team-dev"))
        .create_async()
        .await;

    let resource = subscription_resource(&server.url()).await;

    // Create
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "azurepreview_subscription".to_string(),
                planned_state: config(),
                config: config(),
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    let state = SubscriptionModel::from_dynamic(&created.new_state);
    assert_eq!(state.id, Some(format!("/subscriptions/{}", GUID)));
    assert_eq!(state.subscription_id.as_deref(), Some(GUID));
    assert_eq!(state.tenant_id.as_deref(), Some("tenant-9"));
    create.assert_async().await;
    status.assert_async().await;
    result.assert_async().await;

    // Read
    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "azurepreview_subscription".to_string(),
                current_state: created.new_state.clone(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(read.diagnostics.is_empty());
    let current = read.new_state.unwrap();
    assert_eq!(
        current.get_string(&AttributePath::new("name")).unwrap(),
        "team-dev"
    );

    // Rename
    let rename = server
        .mock(
            "POST",
            format!("/subscriptions/{}/providers/Microsoft.Subscription/rename", GUID).as_str(),
        )
        .match_query(Matcher::UrlEncoded(
            "api-version".into(),
            "2019-10-01-preview".into(),
        ))
        .match_body(Matcher::JsonString(
            r#"{"SubscriptionName":"team-prod"}"#.to_string(),
        ))
        .with_body(format!(r#"{{"subscriptionId":"{}"}}"#, GUID))
        .expect(1)
        .create_async()
        .await;

    let mut planned = current.clone();
    planned
        .set_string(&AttributePath::new("name"), "team-prod".to_string())
        .unwrap();
    let updated = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "azurepreview_subscription".to_string(),
                prior_state: current.clone(),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;
    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    rename.assert_async().await;

    // Cancel
    let cancel = server
        .mock(
            "POST",
            format!("/subscriptions/{}/providers/Microsoft.Subscription/cancel", GUID).as_str(),
        )
        .match_query(Matcher::Any)
        .with_body(format!(r#"{{"subscriptionId":"{}"}}"#, GUID))
        .expect(1)
        .create_async()
        .await;

    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "azurepreview_subscription".to_string(),
                prior_state: updated.new_state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    cancel.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_creation_operation_is_reported() {
    let mut server = Server::new_async().await;
    let status_url = format!("{}/operations/create-2/status", server.url());

    let _create = server
        .mock("POST", CREATE_PATH)
        .match_query(Matcher::Any)
        .with_status(202)
        .with_header("Azure-AsyncOperation", &status_url)
        .with_header("Retry-After", "0")
        .create_async()
        .await;
    let _status = server
        .mock("GET", "/operations/create-2/status")
        .with_body(
            r#"{"status":"Failed","error":{"code":"EnrollmentAccountNotFound","message":"no such account"}}"#,
        )
        .create_async()
        .await;

    let resource = subscription_resource(&server.url()).await;
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "azurepreview_subscription".to_string(),
                planned_state: config(),
                config: config(),
            },
        )
        .await;

    assert_eq!(created.diagnostics.len(), 1);
    assert_eq!(created.diagnostics[0].summary, "Azure API request failed");
    assert!(created.diagnostics[0].detail.contains("ea-42"));
    assert!(created.diagnostics[0].detail.contains("no such account"));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_context_stops_polling() {
    let mut server = Server::new_async().await;
    let status_url = format!("{}/operations/slow/status", server.url());

    let _create = server
        .mock("POST", CREATE_PATH)
        .match_query(Matcher::Any)
        .with_status(202)
        .with_header("Azure-AsyncOperation", &status_url)
        .with_header("Retry-After", "1")
        .create_async()
        .await;
    let status = server
        .mock("GET", "/operations/slow/status")
        .with_body(r#"{"status":"InProgress"}"#)
        .expect(0)
        .create_async()
        .await;

    let resource = subscription_resource(&server.url()).await;
    let ctx = Context::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let created = resource
        .create(
            ctx,
            CreateResourceRequest {
                type_name: "azurepreview_subscription".to_string(),
                planned_state: config(),
                config: config(),
            },
        )
        .await;

    assert_eq!(created.diagnostics.len(), 1);
    assert!(created.diagnostics[0].detail.to_lowercase().contains("cancel"));
    status.assert_async().await;
}
