//! Integration tests for the resources data source

use crate::provider_data;
use azurepreview::AzurePreviewProvider;
use mockito::{Matcher, Server};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfplug::provider::Provider;
use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue};

fn names(state: &DynamicValue) -> Vec<String> {
    state
        .get_list(&AttributePath::new("resources"))
        .unwrap()
        .iter()
        .filter_map(|r| r.as_map()?.get("name")?.as_str().map(str::to_string))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn lists_every_page_and_applies_tag_and_filter() {
    let mut server = Server::new_async().await;
    let page_two = format!(
        "{}/subscriptions/sub-1/resources?api-version=2020-06-01&%24skiptoken=abc",
        server.url()
    );

    let _first = server
        .mock("GET", "/subscriptions/sub-1/resources")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api-version".into(), "2020-06-01".into()),
            Matcher::UrlEncoded(
                "$filter".into(),
                "resourceType eq 'Microsoft.Storage/storageAccounts'".into(),
            ),
        ]))
        .with_body(format!(
            r#"{{"value":[
                {{"id":"/r/a","name":"a","type":"Microsoft.Storage/storageAccounts","location":"westeurope","tags":{{"env":"prod","team":"core"}}}},
                {{"id":"/r/b","name":"b","type":"Microsoft.Storage/storageAccounts","location":"westeurope","tags":{{"env":"prod"}}}}
            ],"nextLink":"{}"}}"#,
            page_two
        ))
        .create_async()
        .await;
    let _second = server
        .mock("GET", "/subscriptions/sub-1/resources")
        .match_query(Matcher::UrlEncoded("$skiptoken".into(), "abc".into()))
        .with_body(
            r#"{"value":[
                {"id":"/r/c","name":"c","type":"Microsoft.Storage/storageAccounts","location":"northeurope","tags":{"env":"prod","team":"core"}},
                {"id":"/r/d","name":"d","type":"Microsoft.Storage/storageAccounts","location":"northeurope"}
            ]}"#,
        )
        .create_async()
        .await;

    let provider = AzurePreviewProvider::new();
    let mut data_source = provider.data_sources()["azurepreview_resources"]();
    let configured = data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(provider_data(&server.url())),
            },
        )
        .await;
    assert!(configured.diagnostics.is_empty());

    let mut config = DynamicValue::object();
    config
        .set_string(
            &AttributePath::new("type"),
            "Microsoft.Storage/storageAccounts".to_string(),
        )
        .unwrap();
    config
        .set(
            &AttributePath::new("tags"),
            Dynamic::Map(HashMap::from([
                ("env".to_string(), Dynamic::from("prod")),
                ("team".to_string(), Dynamic::from("core")),
            ])),
        )
        .unwrap();

    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "azurepreview_resources".to_string(),
                config: config.clone(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(names(&response.state), vec!["a", "c"]);

    let first_id = response
        .state
        .get_string(&AttributePath::new("id"))
        .unwrap();

    // Without tags every listed resource comes back, under a fresh id
    config
        .set(&AttributePath::new("tags"), Dynamic::Null)
        .unwrap();
    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "azurepreview_resources".to_string(),
                config,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert_eq!(names(&response.state), vec!["a", "b", "c", "d"]);
    assert_ne!(
        response
            .state
            .get_string(&AttributePath::new("id"))
            .unwrap(),
        first_id
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn api_errors_become_diagnostics() {
    let mut server = Server::new_async().await;
    let _forbidden = server
        .mock("GET", "/subscriptions/sub-1/resources")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error":{"code":"AuthorizationFailed","message":"not allowed"}}"#)
        .create_async()
        .await;

    let provider = AzurePreviewProvider::new();
    let mut data_source = provider.data_sources()["azurepreview_resources"]();
    data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(provider_data(&server.url())),
            },
        )
        .await;

    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "azurepreview_resources".to_string(),
                config: DynamicValue::object(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("AuthorizationFailed"));
}
